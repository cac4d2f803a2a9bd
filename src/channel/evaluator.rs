//! Evaluation backends.
//!
//! An [`Evaluator`] turns generated code into result text. Failures are not
//! errors at this level: a thrown exception comes back as text starting
//! with `throw `, which the console renders on stderr.

/// Runs code and renders the completion value.
pub trait Evaluator {
    /// Evaluate `source`. `None` means the code produced no value.
    fn evaluate(&mut self, source: &str) -> Option<String>;

    fn collect_garbage(&mut self);

    /// Throw away all state and start from a fresh global scope.
    fn reset(&mut self) -> anyhow::Result<()>;
}

/// Quote `text` as a string literal.
pub fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

#[cfg(feature = "local-eval")]
pub use quickjs::QuickJsEvaluator;

#[cfg(feature = "local-eval")]
mod quickjs {
    use super::{quote, Evaluator};
    use crate::services::signal_handler::CONTROLLER;
    use anyhow::{anyhow, Result};
    use rquickjs::{Context, Ctx, Function, Object, Runtime, Value};

    /// In-process QuickJS interpreter.
    pub struct QuickJsEvaluator {
        runtime: Runtime,
        context: Context,
        args: Vec<String>,
    }

    impl QuickJsEvaluator {
        /// `args` become `system.args` inside the interpreter.
        pub fn new(args: Vec<String>) -> Result<Self> {
            tracing::debug!("QuickJsEvaluator::new: creating QuickJS runtime");
            let runtime =
                Runtime::new().map_err(|e| anyhow!("Failed to create QuickJS runtime: {}", e))?;
            // Polled by QuickJS while code runs; SIGINT raises the flag
            runtime.set_interrupt_handler(Some(Box::new(|| CONTROLLER.cancel_requested())));

            let context = new_context(&runtime, &args)?;
            Ok(Self {
                runtime,
                context,
                args,
            })
        }
    }

    fn new_context(runtime: &Runtime, args: &[String]) -> Result<Context> {
        let context = Context::full(runtime)
            .map_err(|e| anyhow!("Failed to create QuickJS context: {}", e))?;
        context
            .with(|ctx| -> rquickjs::Result<()> {
                let system = Object::new(ctx.clone())?;
                system.set("args", args.to_vec())?;
                ctx.globals().set("system", system)?;
                Ok(())
            })
            .map_err(|e| anyhow!("Failed to install globals: {}", e))?;
        Ok(context)
    }

    impl Evaluator for QuickJsEvaluator {
        fn evaluate(&mut self, source: &str) -> Option<String> {
            self.context.with(|ctx| {
                let result = ctx.eval::<Value, _>(source);
                while ctx.execute_pending_job() {}
                match result {
                    Ok(value) => render_value(&ctx, value),
                    Err(err) => Some(format!("throw {}", render_exception(&ctx, err))),
                }
            })
        }

        fn collect_garbage(&mut self) {
            self.runtime.run_gc();
        }

        fn reset(&mut self) -> Result<()> {
            self.context = new_context(&self.runtime, &self.args)?;
            self.runtime.run_gc();
            tracing::debug!("QuickJS context recreated");
            Ok(())
        }
    }

    /// JSON where possible, `String(value)` otherwise.
    fn render_value<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Option<String> {
        if value.is_undefined() {
            return None;
        }
        match ctx.json_stringify(value.clone()) {
            Ok(Some(json)) => match json.to_string() {
                Ok(json) => Some(json),
                Err(_) => Some(display_string(ctx, value)),
            },
            Ok(None) => Some(display_string(ctx, value)),
            Err(_) => {
                // Cycles and BigInt make JSON.stringify throw
                let _ = ctx.catch();
                Some(display_string(ctx, value))
            }
        }
    }

    fn display_string<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> String {
        let type_name = value.type_name();
        let rendered = ctx
            .globals()
            .get::<_, Function>("String")
            .and_then(|string| string.call::<_, String>((value,)));
        match rendered {
            Ok(text) => text,
            Err(_) => {
                let _ = ctx.catch();
                format!("[{}]", type_name)
            }
        }
    }

    /// Render a thrown value as the expression that would rethrow it.
    fn render_exception(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
        if !err.is_exception() {
            return format!("new Error({})", quote(&err.to_string()));
        }

        let exc = ctx.catch();
        if let Some(exception) = exc.as_exception() {
            let name: String = exception
                .get::<_, String>("name")
                .unwrap_or_else(|_| "Error".to_string());
            let message = exception.message().unwrap_or_default();
            return format!("new {}({})", name, quote(&message));
        }
        render_value(ctx, exc).unwrap_or_else(|| "undefined".to_string())
    }

}
