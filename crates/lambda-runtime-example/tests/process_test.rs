//! Runs the `hello_runtime` binary as a child process against the simulator.

use lambda_runtime_example::{INVALID_SALUTATION, SALUTATION_VAR};
use lambda_simulator::{InvocationBuilder, PostKind, Simulator};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const EXIT_TIMEOUT: Duration = Duration::from_secs(30);

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn spawn(simulator: Option<&Simulator>) -> Child {
    spawn_with(simulator, &[])
}

fn spawn_with(simulator: Option<&Simulator>, vars: &[(&str, &str)]) -> Child {
    let mut command = Command::new(env!("CARGO_BIN_EXE_hello_runtime"));
    command
        .env_remove("AWS_LAMBDA_RUNTIME_API")
        .env_remove(SALUTATION_VAR)
        .envs(vars.iter().copied())
        .env("RUST_LOG", "debug")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(simulator) = simulator {
        command.envs(simulator.lambda_env_vars());
    }
    command.spawn().expect("Failed to spawn hello_runtime")
}

fn wait_with_timeout(mut child: Child) -> ExitStatus {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().expect("Failed to poll child") {
            return status;
        }
        if started.elapsed() > EXIT_TIMEOUT {
            let _ = child.kill();
            panic!("hello_runtime did not exit within {EXIT_TIMEOUT:?}");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn malformed() -> lambda_simulator::Invocation {
    InvocationBuilder::new()
        .omit_header("Lambda-Runtime-Deadline-Ms")
        .build()
}

#[test]
fn test_serves_invocations_then_exits_when_budget_spent() {
    let rt = runtime();
    let simulator = rt
        .block_on(Simulator::builder().function_name("greeter").build())
        .unwrap();

    rt.block_on(async {
        simulator
            .enqueue(
                InvocationBuilder::new()
                    .request_id("abc123")
                    .payload(r#"{"firstName":"Ada"}"#)
                    .build(),
            )
            .await;
        simulator
            .enqueue(
                InvocationBuilder::new()
                    .request_id("def456")
                    .payload("not json")
                    .build(),
            )
            .await;
        for _ in 0..3 {
            simulator.enqueue(malformed()).await;
        }
    });

    let status = wait_with_timeout(spawn(Some(&simulator)));
    assert_eq!(status.code(), Some(1));

    let posts = rt.block_on(simulator.posts());
    assert_eq!(posts.len(), 2);

    assert_eq!(posts[0].kind, PostKind::Response);
    assert_eq!(posts[0].request_id.as_deref(), Some("abc123"));
    assert_eq!(&posts[0].body[..], br#"{"message":"Hello Ada"}"#);
    assert_eq!(posts[0].content_length(), Some(23));

    assert_eq!(posts[1].kind, PostKind::Error);
    assert_eq!(posts[1].request_id.as_deref(), Some("def456"));
    assert_eq!(posts[1].json().unwrap()["errorType"], "invalidPayload");

    assert_eq!(simulator.next_request_count(), 5);
}

#[test]
fn test_three_malformed_events_terminate_without_posting() {
    let rt = runtime();
    let simulator = rt.block_on(Simulator::builder().build()).unwrap();

    rt.block_on(async {
        for _ in 0..3 {
            simulator.enqueue(malformed()).await;
        }
    });

    let status = wait_with_timeout(spawn(Some(&simulator)));

    assert_eq!(status.code(), Some(1));
    assert!(rt.block_on(simulator.posts()).is_empty());
    assert_eq!(simulator.next_request_count(), 3);
}

#[test]
fn test_missing_runtime_api_exits_with_failure() {
    let status = wait_with_timeout(spawn(None));
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_blank_salutation_reports_init_error_and_exits() {
    let rt = runtime();
    let simulator = rt.block_on(Simulator::builder().build()).unwrap();
    rt.block_on(simulator.enqueue_payload(r#"{"firstName":"Ada"}"#));

    let status = wait_with_timeout(spawn_with(Some(&simulator), &[(SALUTATION_VAR, "  ")]));
    assert_eq!(status.code(), Some(1));

    let posts = rt.block_on(simulator.posts());
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].kind, PostKind::InitError);
    assert_eq!(posts[0].path, "/2018-06-01/runtime/init/error");
    assert_eq!(
        posts[0].header("lambda-runtime-function-error-type"),
        Some(INVALID_SALUTATION)
    );
    assert_eq!(posts[0].json().unwrap()["errorType"], INVALID_SALUTATION);
    assert_eq!(rt.block_on(simulator.init_errors()).len(), 1);

    // The queued event is never fetched.
    assert_eq!(simulator.next_request_count(), 0);
}

#[test]
fn test_configured_salutation_is_used() {
    let rt = runtime();
    let simulator = rt.block_on(Simulator::builder().build()).unwrap();

    rt.block_on(async {
        simulator
            .enqueue(
                InvocationBuilder::new()
                    .request_id("abc123")
                    .payload(r#"{"firstName":"Ada"}"#)
                    .build(),
            )
            .await;
        for _ in 0..3 {
            simulator.enqueue(malformed()).await;
        }
    });

    let status = wait_with_timeout(spawn_with(Some(&simulator), &[(SALUTATION_VAR, "Howdy")]));
    assert_eq!(status.code(), Some(1));

    let posts = rt.block_on(simulator.posts());
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].kind, PostKind::Response);
    assert_eq!(&posts[0].body[..], br#"{"message":"Howdy Ada"}"#);
}
