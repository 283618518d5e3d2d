//! Benchmarks for decoding invocations and encoding results.

use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use http::{HeaderMap, HeaderName, HeaderValue};
use lambda_runtime_client::{
    CLIENT_CONTEXT_HEADER, DEADLINE_MS_HEADER, ErrorEnvelope, FUNCTION_ARN_HEADER,
    FunctionConfig, InvocationContext, InvocationResult, REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
use std::hint::black_box;
use std::sync::Arc;

fn headers(extra: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    let base = [
        (REQUEST_ID_HEADER, "8476a536-e9f4-11e8-9739-2dfe598c3fcd"),
        (
            FUNCTION_ARN_HEADER,
            "arn:aws:lambda:us-east-1:123456789012:function:greeter",
        ),
        (TRACE_ID_HEADER, "Root=1-5759e988-bd862e3fe1be46a994272793"),
        (DEADLINE_MS_HEADER, "1700000000000"),
    ];
    for (name, value) in base.iter().chain(extra) {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    map
}

fn bench_from_parts(c: &mut Criterion) {
    let env = Arc::new(FunctionConfig::default());
    let payload = Bytes::from_static(br#"{"firstName":"Ada"}"#);
    let minimal = headers(&[]);
    let with_context = headers(&[(
        CLIENT_CONTEXT_HEADER,
        r#"{"client":{"installation_id":"abc","app_title":"demo"},"custom":{"k":"v"}}"#,
    )]);

    c.bench_function("InvocationContext::from_parts", |b| {
        b.iter(|| {
            InvocationContext::from_parts(
                black_box(&minimal),
                payload.clone(),
                Arc::clone(&env),
            )
        })
    });

    c.bench_function("InvocationContext::from_parts with client context", |b| {
        b.iter(|| {
            InvocationContext::from_parts(
                black_box(&with_context),
                payload.clone(),
                Arc::clone(&env),
            )
        })
    });
}

fn bench_error_envelope(c: &mut Criterion) {
    let envelope = ErrorEnvelope::new("invalidPayload", "Payload is invalid")
        .with_stack_trace(["handler", "dispatch", "main"]);

    c.bench_function("ErrorEnvelope::to_json", |b| {
        b.iter(|| black_box(&envelope).to_json())
    });
}

fn bench_result_body(c: &mut Criterion) {
    let success = InvocationResult::success(&br#"{"message":"Hello Ada"}"#[..], "application/json");
    let failure = InvocationResult::failure("invalidPayload", "Payload is invalid");

    c.bench_function("InvocationResult::body success", |b| {
        b.iter(|| black_box(&success).body())
    });
    c.bench_function("InvocationResult::body failure", |b| {
        b.iter(|| black_box(&failure).body())
    });
}

criterion_group!(
    benches,
    bench_from_parts,
    bench_error_envelope,
    bench_result_body,
);
criterion_main!(benches);
