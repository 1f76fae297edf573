//! Example implementing a tool and validating arguments against its schema

use async_trait::async_trait;
use sdk::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolArgs, ToolError};
use serde_json::{json, Value};

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeat a message a number of times"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::required("message", ParamType::String, "Text to repeat"),
            ParameterSpec::optional("times", ParamType::Integer, "Repetitions (default 1)"),
        ])
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let message = args.param_str("message")?;
        let times = args.param_i64_opt("times").unwrap_or(1);
        if !(1..=10).contains(&times) {
            return Err(ToolError::invalid_input("times must be between 1 and 10"));
        }
        Ok(json!({ "echo": vec![message; times as usize] }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let tool = EchoTool;
    println!("Descriptor: {}", serde_json::to_string_pretty(&tool.descriptor()).unwrap());

    // Valid arguments pass the schema and reach the tool
    let args = ToolArgs::new()
        .with_param("message", json!("hello"))
        .with_param("times", json!(3));
    match tool.parameters().validate(&args) {
        Ok(()) => println!("Output: {:?}", tool.invoke(&args).await),
        Err(violation) => println!("Rejected: {}", violation),
    }

    // Wrong types and unknown parameters are caught before invocation
    let bad = ToolArgs::new()
        .with_param("message", json!(42))
        .with_param("volume", json!("loud"));
    if let Err(violation) = tool.parameters().validate(&bad) {
        println!("Rejected: {}", violation);
    }

    // Tool errors carry a reason that decides whether a retry makes sense
    let err = ToolError::rate_limited("429 from upstream");
    println!("{} (transient: {})", err, err.is_transient());
}
