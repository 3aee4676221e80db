use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "status": "success",
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a list of rows, one line per row in text mode
pub fn output_rows(output_format: &OutputFormat, rows: Vec<Value>, line: impl Fn(&Value) -> String) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&Value::Array(rows))?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("(none)");
            }
            for row in &rows {
                println!("{}", line(row));
            }
        }
    }
    Ok(())
}
