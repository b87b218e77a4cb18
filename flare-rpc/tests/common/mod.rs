#![allow(dead_code)]

use std::sync::Arc;

use flare_rpc::{
    AnyError, ArgBundle, BincodeMsgSerde, CallerContext, Context, Contextual,
    Dispatcher, Fault, Interface, MethodDecl, MsgSerde, Payload, Reply,
    Request, ServiceBinding,
};

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct IllegalState(pub String);

#[derive(Default)]
pub struct CalcService {
    pub invoked_by: Option<String>,
}

impl Contextual for CalcService {
    fn bind(&self, caller: &CallerContext) -> Result<Self, AnyError> {
        if caller.contains_key("deny") {
            return Err(AnyError::error("caller is not allowed"));
        }
        Ok(CalcService {
            invoked_by: caller.get("invoked-by").map(str::to_string),
        })
    }
}

pub fn calc_interface() -> Interface {
    Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", "b"]))
        .method(MethodDecl::future("plusAsync").params(["a", "b"]))
        .method(MethodDecl::sync("fail").param("message"))
        .method(MethodDecl::future("failAsync").param("message"))
        .method(MethodDecl::sync("explode"))
        .method(MethodDecl::future("explodeAsync"))
        .method(MethodDecl::sync("whoami"))
        .method(MethodDecl::sync("stamp").param("by"))
}

pub fn calc_binding() -> ServiceBinding<CalcService, BincodeMsgSerde> {
    ServiceBinding::contextual(calc_interface(), CalcService::default())
        .sync(
            "plus",
            |_: &CalcService, _: &mut Context, (a, b): (f64, f64)| {
                Ok::<_, IllegalState>(a + b)
            },
        )
        .future(
            "plusAsync",
            |_: Arc<CalcService>, _: Context, (a, b): (f64, f64)| async move {
                tokio::task::yield_now().await;
                Ok::<_, IllegalState>(a + b)
            },
        )
        .sync(
            "fail",
            |_: &CalcService, _: &mut Context, (message,): (String,)| {
                Err::<f64, _>(IllegalState(message))
            },
        )
        .future(
            "failAsync",
            |_: Arc<CalcService>, _: Context, (message,): (String,)| async move {
                tokio::task::yield_now().await;
                Err::<f64, _>(IllegalState(message))
            },
        )
        .sync("explode", |_: &CalcService, _: &mut Context, _: ()| {
            if true {
                panic!("BOOM");
            }
            Ok::<f64, IllegalState>(0.0)
        })
        .future(
            "explodeAsync",
            |_: Arc<CalcService>, _: Context, _: ()| async move {
                tokio::task::yield_now().await;
                if true {
                    panic!("BOOM");
                }
                Ok::<f64, IllegalState>(0.0)
            },
        )
        .sync("whoami", |svc: &CalcService, _: &mut Context, _: ()| {
            Ok::<_, IllegalState>(svc.invoked_by.clone())
        })
        .sync(
            "stamp",
            |_: &CalcService, ctx: &mut Context, (by,): (String,)| {
                ctx.put("Handled-By", by);
                ctx.remove("secret");
                Ok::<_, IllegalState>(ctx.clone())
            },
        )
}

pub fn calc_dispatcher() -> Arc<Dispatcher<BincodeMsgSerde>> {
    Arc::new(
        Dispatcher::builder(BincodeMsgSerde)
            .bind(calc_binding())
            .build()
            .expect("calc dispatcher should build"),
    )
}

pub fn request<T: serde::Serialize>(
    context: Context,
    args: &[(&str, T)],
) -> Payload {
    let serde = BincodeMsgSerde;
    let mut bundle = ArgBundle::new();
    for (name, value) in args {
        bundle.insert(*name, serde.to_bytes(value).unwrap());
    }
    serde
        .encode(&Request {
            context,
            args: bundle,
        })
        .unwrap()
}

pub fn success<T: serde::de::DeserializeOwned>(reply: Reply) -> T {
    match reply {
        Reply::Success(payload) => BincodeMsgSerde.decode(&payload).unwrap(),
        Reply::Failure(payload) => {
            let fault: Fault = BincodeMsgSerde.decode(&payload).unwrap();
            panic!("expected success, got {fault}")
        }
    }
}

pub fn fault(reply: Reply) -> Fault {
    match reply {
        Reply::Failure(payload) => BincodeMsgSerde.decode(&payload).unwrap(),
        Reply::Success(_) => panic!("expected failure"),
    }
}
