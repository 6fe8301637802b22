use crate::render_bridge::model::RenderModel;
use anyhow::{anyhow, Context, Result};
use motecore::powertracker::{AssemblyReport, PowerRecord};
use serde::Serialize;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{
    http::StatusCode,
    reply::{Reply, Response},
    Filter, Rejection,
};

pub type SharedModel = Arc<RwLock<RenderModel>>;

#[derive(Serialize)]
struct PowerPayload<'a> {
    records: &'a [PowerRecord],
    report: &'a AssemblyReport,
}

fn respond(state: &SharedModel, render: impl FnOnce(&RenderModel) -> Response) -> Response {
    match state.read() {
        Ok(model) => render(&*model),
        Err(_) => warp::reply::with_status(
            "render state unavailable",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .into_response(),
    }
}

/// `GET /dodag`, `GET /dodag/dot` and `GET /powertracker` over the shared snapshot.
pub fn routes(state: SharedModel) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let dodag = warp::path!("dodag")
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: SharedModel| {
            respond(&state, |model| warp::reply::json(&model.graph).into_response())
        });

    let dot = warp::path!("dodag" / "dot")
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: SharedModel| {
            respond(&state, |model| {
                warp::reply::with_header(model.graph.to_dot(), "content-type", "text/vnd.graphviz")
                    .into_response()
            })
        });

    let power = warp::path!("powertracker")
        .and(warp::get())
        .and(state_filter)
        .map(|state: SharedModel| {
            respond(&state, |model| {
                warp::reply::json(&PowerPayload {
                    records: &model.records,
                    report: &model.report,
                })
                .into_response()
            })
        });

    dodag.or(dot).or(power)
}

/// Publishes parsed experiments to an external renderer over HTTP.
pub struct RenderBridge {
    state: SharedModel,
}

impl RenderBridge {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RenderModel::default())),
        }
    }

    /// Binds the endpoint and serves it from a background thread. Returns
    /// the bound address.
    pub fn serve(&self, address: SocketAddr) -> Result<SocketAddr> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building render bridge runtime")?;
        let (bound, server) = {
            let _guard = runtime.enter();
            warp::serve(routes(self.state.clone()))
                .try_bind_ephemeral(address)
                .with_context(|| format!("binding render bridge on {}", address))?
        };

        thread::spawn(move || runtime.block_on(server));
        log::info!("render bridge listening on {}", bound);
        Ok(bound)
    }

    pub fn publish(&self, model: RenderModel) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| anyhow!("render state poisoned"))?;
        *guard = model;
        println!(
            "[render] DODAG nodes: {}, edges: {}, power records: {}",
            guard.graph.nodes.len(),
            guard.graph.edges.len(),
            guard.records.len()
        );
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[render] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> RenderModel {
        self.state.read().unwrap().clone()
    }

    #[cfg(test)]
    pub fn state(&self) -> SharedModel {
        self.state.clone()
    }
}

impl Default for RenderBridge {
    fn default() -> Self {
        Self::new()
    }
}
