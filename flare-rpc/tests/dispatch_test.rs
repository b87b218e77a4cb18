mod common;

use std::sync::Arc;

use common::{
    CalcService, IllegalState, calc_binding, calc_dispatcher, fault, request,
    success,
};
use flare_rpc::{
    ArgBundle, BincodeMsgSerde, ConfigError, Context, Dispatcher, FaultKind,
    Interface, MethodDecl, MsgSerde, PANIC_TYPE, Payload, ServiceBinding,
};
use pretty_assertions::assert_eq;
use tracing::info;
use tracing_test::traced_test;

#[traced_test]
#[tokio::test]
async fn plus_resolves_case_insensitively() {
    let dispatcher = calc_dispatcher();
    let req = request(Context::new(), &[("a", 2.0f64), ("b", 3.0f64)]);
    let out: f64 = success(dispatcher.serve("/Calc/Plus", &req).await);
    info!("return output = {}", out);
    assert_eq!(out, 5.0);

    let out: f64 = success(dispatcher.serve("CALC/PLUSASYNC", &req).await);
    assert_eq!(out, 5.0);
}

#[tokio::test]
async fn exact_names_dispatch_without_router() {
    let dispatcher = calc_dispatcher();
    let serde = BincodeMsgSerde;
    let mut args = ArgBundle::new();
    args.insert("b", serde.to_bytes(&0.5f64).unwrap());
    args.insert("a", serde.to_bytes(&1.0f64).unwrap());
    let reply = dispatcher
        .dispatch("calc", "plus", Context::new(), args.clone())
        .await;
    assert_eq!(success::<f64>(reply), 1.5);

    // only the router folds case
    let reply = dispatcher.dispatch("Calc", "plus", Context::new(), args).await;
    assert_eq!(fault(reply).kind, FaultKind::NotFound);
}

#[traced_test]
#[tokio::test]
async fn sync_and_async_failures_look_the_same() {
    let dispatcher = calc_dispatcher();
    let req = request(Context::new(), &[("message", "BOOM")]);
    let sync_fault = fault(dispatcher.serve("/calc/fail", &req).await);
    let async_fault = fault(dispatcher.serve("/calc/failAsync", &req).await);
    info!("return err = {:?}", sync_fault);
    assert_eq!(sync_fault.kind, FaultKind::Invocation);
    assert!(sync_fault.message.contains("BOOM"));
    assert!(sync_fault.type_name.ends_with("IllegalState"));
    assert_eq!(sync_fault, async_fault);
}

#[tokio::test]
async fn panics_become_invocation_faults() {
    let dispatcher = calc_dispatcher();
    let req = request::<u8>(Context::new(), &[]);
    let sync_fault = fault(dispatcher.serve("/calc/explode", &req).await);
    let async_fault = fault(dispatcher.serve("/calc/explodeAsync", &req).await);
    assert_eq!(sync_fault.kind, FaultKind::Invocation);
    assert_eq!(sync_fault.type_name, PANIC_TYPE);
    assert_eq!(sync_fault.message, "BOOM");
    assert_eq!(sync_fault, async_fault);

    // the dispatcher keeps serving
    let req = request(Context::new(), &[("a", 1.0f64), ("b", 1.0f64)]);
    assert_eq!(success::<f64>(dispatcher.serve("/calc/plus", &req).await), 2.0);
}

#[tokio::test]
async fn malformed_arguments_are_deserialization_faults() {
    let dispatcher = calc_dispatcher();

    let missing = request(Context::new(), &[("a", 2.0f64)]);
    let f = fault(dispatcher.serve("/calc/plus", &missing).await);
    assert_eq!(f.kind, FaultKind::Deserialization);
    assert!(f.message.contains("'b'"));

    let mistyped = request(Context::new(), &[("a", true), ("b", false)]);
    let f = fault(dispatcher.serve("/calc/plus", &mistyped).await);
    assert_eq!(f.kind, FaultKind::Deserialization);

    let garbage = Payload::new(BincodeMsgSerde::CONTENT_TYPE, vec![0xff, 0xff]);
    let f = fault(dispatcher.serve("/calc/plus", &garbage).await);
    assert_eq!(f.kind, FaultKind::Deserialization);

    let foreign = Payload::new("application/json", b"{}".to_vec());
    let f = fault(dispatcher.serve("/calc/plus", &foreign).await);
    assert_eq!(f.kind, FaultKind::Deserialization);
}

#[tokio::test]
async fn contextual_instance_reads_caller_context() {
    let dispatcher = calc_dispatcher();
    let ctx = Context::new().with("Invoked-By", "tester");
    let req = request::<u8>(ctx, &[]);
    let who: Option<String> = success(dispatcher.serve("/calc/whoami", &req).await);
    assert_eq!(who.as_deref(), Some("tester"));

    let req = request::<u8>(Context::new(), &[]);
    let who: Option<String> = success(dispatcher.serve("/calc/whoami", &req).await);
    assert_eq!(who, None);
}

#[tokio::test]
async fn implementation_edits_its_own_call_context() {
    let dispatcher = calc_dispatcher();
    let ctx = Context::new().with("trace", "t-1").with("Secret", "s3cr3t");
    let req = request(ctx.clone(), &[("by", "stamp")]);
    let seen: Context = success(dispatcher.serve("/calc/stamp", &req).await);
    assert_eq!(seen.get("handled-by"), Some("stamp"));
    assert_eq!(seen.get("TRACE"), Some("t-1"));
    assert!(!seen.contains_key("secret"));
    // the caller's copy is untouched
    assert_eq!(ctx.get("secret"), Some("s3cr3t"));
    assert!(!ctx.contains_key("handled-by"));
}

#[tokio::test]
async fn failed_binding_is_an_instantiation_fault() {
    let dispatcher = calc_dispatcher();
    let req = request(
        Context::new().with("DENY", "yes"),
        &[("a", 2.0f64), ("b", 3.0f64)],
    );
    let f = fault(dispatcher.serve("/calc/plus", &req).await);
    assert_eq!(f.kind, FaultKind::Instantiation);
    assert!(f.message.contains("not allowed"));
}

#[tokio::test]
async fn unknown_addresses_are_not_found() {
    let dispatcher = calc_dispatcher();
    let req = request(Context::new(), &[("a", 2.0f64), ("b", 3.0f64)]);
    for path in ["/calc/times", "/calc/plus/extra", "/calc", "/other/plus"] {
        let f = fault(dispatcher.serve(path, &req).await);
        assert_eq!(f.kind, FaultKind::NotFound, "{path}");
    }
}

#[tokio::test]
async fn case_sensitive_mode_requires_exact_address() {
    let dispatcher = Dispatcher::builder(BincodeMsgSerde)
        .case_sensitive(true)
        .bind(calc_binding())
        .build()
        .unwrap();
    let req = request(Context::new(), &[("a", 2.0f64), ("b", 3.0f64)]);
    let f = fault(dispatcher.serve("/Calc/Plus", &req).await);
    assert_eq!(f.kind, FaultKind::NotFound);
    assert_eq!(success::<f64>(dispatcher.serve("/calc/plus", &req).await), 5.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_calls_are_independent() {
    let dispatcher = calc_dispatcher();
    let mut tasks = Vec::new();
    for i in 0..64 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let ctx = Context::new().with("invoked-by", format!("caller-{i}"));
            let add = request(ctx.clone(), &[("a", i as f64), ("b", 1.0f64)]);
            let path = if i % 2 == 0 { "/calc/plus" } else { "/calc/plusAsync" };
            let sum: f64 = success(dispatcher.serve(path, &add).await);
            let who: Option<String> = success(
                dispatcher
                    .serve("/calc/whoami", &request::<u8>(ctx, &[]))
                    .await,
            );
            (i, sum, who)
        }));
    }
    for task in tasks {
        let (i, sum, who) = task.await.unwrap();
        assert_eq!(sum, i as f64 + 1.0);
        assert_eq!(who, Some(format!("caller-{i}")));
    }
}

#[test]
fn addresses_are_generated_once_per_method() {
    let dispatcher = Dispatcher::builder(BincodeMsgSerde)
        .bind(calc_binding())
        .bind(
            ServiceBinding::shared(
                Interface::new("echo")
                    .method(MethodDecl::sync("say").param("text")),
                (),
            )
            .sync("say", |_: &(), _: &mut Context, (text,): (String,)| {
                Ok::<_, IllegalState>(text)
            }),
        )
        .build()
        .unwrap();
    let mut addresses: Vec<_> = dispatcher
        .router()
        .routes()
        .iter()
        .map(|r| r.pattern.literal().to_string())
        .collect();
    addresses.sort();
    assert_eq!(
        addresses,
        vec![
            "/calc/explode",
            "/calc/explodeAsync",
            "/calc/fail",
            "/calc/failAsync",
            "/calc/plus",
            "/calc/plusAsync",
            "/calc/stamp",
            "/calc/whoami",
            "/echo/say",
        ]
    );
    assert_eq!(dispatcher.services().count(), 2);
}

fn plus_only(iface: Interface) -> ServiceBinding<CalcService, BincodeMsgSerde> {
    ServiceBinding::shared(iface, CalcService::default()).sync(
        "plus",
        |_: &CalcService, _: &mut Context, (a, b): (f64, f64)| {
            Ok::<_, IllegalState>(a + b)
        },
    )
}

fn build_err(binding: ServiceBinding<CalcService, BincodeMsgSerde>) -> ConfigError {
    match Dispatcher::builder(BincodeMsgSerde).bind(binding).build() {
        Ok(_) => panic!("build should fail"),
        Err(err) => err,
    }
}

#[test]
fn unnamed_parameter_fails_at_build() {
    let iface =
        Interface::new("calc").method(MethodDecl::sync("plus").param("a"));
    assert_eq!(
        build_err(plus_only(iface)),
        ConfigError::MissingParamName {
            service: "calc".into(),
            method: "plus".into(),
            index: 1,
        }
    );

    let iface = Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", " "]));
    assert!(matches!(
        build_err(plus_only(iface)),
        ConfigError::MissingParamName { index: 1, .. }
    ));
}

#[test]
fn incomplete_or_mismatched_bindings_fail_at_build() {
    let iface = Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", "b"]))
        .method(MethodDecl::sync("minus").params(["a", "b"]));
    assert!(matches!(
        build_err(plus_only(iface)),
        ConfigError::UnboundMethod { .. }
    ));

    let iface = Interface::new("calc")
        .method(MethodDecl::future("plus").params(["a", "b"]));
    assert!(matches!(
        build_err(plus_only(iface)),
        ConfigError::ShapeMismatch { .. }
    ));

    let iface = Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", "b", "c"]));
    assert!(matches!(
        build_err(plus_only(iface)),
        ConfigError::ArityMismatch { declared: 3, actual: 2, .. }
    ));

    let iface = Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", "b"]));
    let twice = plus_only(iface).sync(
        "plus",
        |_: &CalcService, _: &mut Context, (a, b): (f64, f64)| {
            Ok::<_, IllegalState>(a * b)
        },
    );
    assert!(matches!(
        build_err(twice),
        ConfigError::DuplicateHandler { .. }
    ));

    let iface = Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", "b"]));
    let stray = plus_only(iface).sync(
        "times",
        |_: &CalcService, _: &mut Context, (a, b): (f64, f64)| {
            Ok::<_, IllegalState>(a * b)
        },
    );
    assert!(matches!(build_err(stray), ConfigError::UnknownMethod { .. }));
}

#[test]
fn services_must_not_collide() {
    let iface = || {
        Interface::new("calc").method(MethodDecl::sync("plus").params(["a", "b"]))
    };
    let result = Dispatcher::builder(BincodeMsgSerde)
        .bind(plus_only(iface()))
        .bind(plus_only(iface()))
        .build();
    assert!(matches!(result, Err(ConfigError::DuplicateService(_))));

    let result = Dispatcher::builder(BincodeMsgSerde)
        .bind(plus_only(iface()))
        .bind(plus_only(iface()).named("Calc"))
        .build();
    assert!(matches!(result, Err(ConfigError::RouteCollision { .. })));

    let result = Dispatcher::builder(BincodeMsgSerde)
        .case_sensitive(true)
        .bind(plus_only(iface()))
        .bind(plus_only(iface()).named("Calc"))
        .build();
    assert!(result.is_ok());
}

#[tokio::test]
async fn renamed_binding_is_served_under_its_new_names() {
    let dispatcher = Arc::new(
        Dispatcher::builder(BincodeMsgSerde)
            .bind(
                calc_binding()
                    .named("Calculator")
                    .rename_method("plus", "add")
                    .rename_param("plus", "b", "rhs"),
            )
            .build()
            .unwrap(),
    );
    let req = request(Context::new(), &[("a", 2.0f64), ("rhs", 3.0f64)]);
    assert_eq!(success::<f64>(dispatcher.serve("/calculator/add", &req).await), 5.0);
    let f = fault(dispatcher.serve("/calc/plus", &req).await);
    assert_eq!(f.kind, FaultKind::NotFound);
}
