//! Shared harness: a simulator on a background tokio runtime, driven from
//! the blocking test thread.

#![allow(dead_code)]

use lambda_runtime_client::{Config, ConfigBuilder, RuntimeApiClient};
use lambda_simulator::{Invocation, InvocationState, RecordedPost, Simulator};
use std::time::Duration;

pub struct Harness {
    pub rt: tokio::runtime::Runtime,
    pub simulator: Simulator,
}

impl Harness {
    pub fn start() -> Self {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to build tokio runtime");
        let simulator = rt
            .block_on(Simulator::builder().function_name("greeter").build())
            .expect("Failed to start simulator");

        Self { rt, simulator }
    }

    pub fn enqueue(&self, invocation: Invocation) -> String {
        self.rt.block_on(self.simulator.enqueue(invocation))
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.rt.block_on(self.simulator.posts())
    }

    pub fn state(&self, request_id: &str) -> Option<InvocationState> {
        self.rt
            .block_on(self.simulator.get_invocation_state(request_id))
    }

    pub fn wait_for_posts(&self, count: usize) -> Vec<RecordedPost> {
        self.rt
            .block_on(self.simulator.wait_for_posts(count, Duration::from_secs(5)))
            .expect("posts should arrive")
    }

    pub fn config(&self) -> ConfigBuilder {
        Config::builder()
            .runtime_api(self.simulator.runtime_api_host())
            .function_name(self.simulator.config().function_name.clone())
    }

    pub fn client(&self) -> RuntimeApiClient {
        self.client_with(self.config())
    }

    pub fn client_with(&self, builder: ConfigBuilder) -> RuntimeApiClient {
        RuntimeApiClient::new(&builder.build()).expect("Failed to build client")
    }
}

/// An address nothing is listening on.
pub fn closed_port_host() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr.to_string()
}
