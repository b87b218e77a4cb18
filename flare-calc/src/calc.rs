use std::sync::Arc;

use flare_rpc::{
    AnyError, BincodeMsgSerde, CallerContext, Context, Contextual, Interface,
    MethodDecl, ServiceBinding,
};

/// Context key holding the caller name.
pub const CALLER_KEY: &str = "caller";

#[derive(thiserror::Error, Debug)]
pub enum CalcError {
    #[error("division by zero")]
    DivideByZero,
}

/// Calculator bound to each caller; `whoami` reports who called it.
#[derive(Default)]
pub struct Calculator {
    caller: Option<String>,
}

impl Contextual for Calculator {
    fn bind(&self, caller: &CallerContext) -> Result<Self, AnyError> {
        Ok(Calculator {
            caller: caller.get(CALLER_KEY).map(str::to_string),
        })
    }
}

pub fn calc_interface() -> Interface {
    Interface::new("calc")
        .method(MethodDecl::sync("plus").params(["a", "b"]))
        .method(MethodDecl::sync("minus").params(["a", "b"]))
        .method(MethodDecl::sync("times").params(["a", "b"]))
        .method(MethodDecl::future("divide").params(["a", "b"]))
        .method(MethodDecl::sync("whoami"))
}

pub fn calc_binding() -> ServiceBinding<Calculator, BincodeMsgSerde> {
    ServiceBinding::contextual(calc_interface(), Calculator::default())
        .sync("plus", |_: &Calculator, _: &mut Context, (a, b): (f64, f64)| {
            Ok::<_, CalcError>(a + b)
        })
        .sync("minus", |_: &Calculator, _: &mut Context, (a, b): (f64, f64)| {
            Ok::<_, CalcError>(a - b)
        })
        .sync("times", |_: &Calculator, _: &mut Context, (a, b): (f64, f64)| {
            Ok::<_, CalcError>(a * b)
        })
        .future(
            "divide",
            |_: Arc<Calculator>, _: Context, (a, b): (f64, f64)| async move {
                if b == 0.0 {
                    Err(CalcError::DivideByZero)
                } else {
                    Ok(a / b)
                }
            },
        )
        .sync("whoami", |calc: &Calculator, _: &mut Context, _: ()| {
            Ok::<_, CalcError>(calc.caller.clone())
        })
}
