//! Command-line interface for compiling and running Nebula workflows.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nebula_action::ActionContext;
use nebula_engine::WorkflowExecutor;
use nebula_workflow::Workflow;

#[derive(Parser)]
#[command(name = "nebula")]
#[command(about = "Compiles and runs declarative workflow graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and compile a workflow, reporting any structural or semantic
    /// error without running it.
    Validate {
        /// Path to a workflow document (JSON or YAML)
        workflow: PathBuf,
    },
    /// Compile and run a workflow against an input document.
    Invoke {
        /// Path to a workflow document (JSON or YAML)
        workflow: PathBuf,
        /// Path to a JSON input document
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn load_workflow(path: &PathBuf) -> Result<Workflow> {
    let src = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let workflow = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => nebula_workflow::from_yaml(&src),
        _ => nebula_workflow::from_json(&src),
    };
    workflow.map_err(|e| anyhow::anyhow!(e))
}

#[tokio::main]
async fn main() -> Result<()> {
    nebula_log::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { workflow } => {
            let workflow = load_workflow(&workflow)?;
            nebula_engine::compile(&workflow).map_err(|e| anyhow::anyhow!(e))?;
            println!("workflow '{}' is valid", workflow.id);
        }
        Commands::Invoke { workflow, input } => {
            let workflow = load_workflow(&workflow)?;
            let input_src =
                fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
            let input: serde_json::Value =
                serde_json::from_str(&input_src).context("input document is not valid JSON")?;

            let executor = WorkflowExecutor::new(ActionContext::new());
            let output = executor
                .invoke(&workflow, input)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_workflow_accepts_json_and_yaml_by_extension() {
        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            json_file,
            r#"{{"id":"wf","version":1,"input":{{"schema":"object"}},"output":{{"input_mapping":{{}}}},"nodes":[],"edges":[{{"from":"start","to":"end"}}]}}"#
        )
        .unwrap();
        let workflow = load_workflow(&json_file.path().to_path_buf()).unwrap();
        assert_eq!(workflow.id, "wf");

        let mut yaml_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            yaml_file,
            "id: wf\nversion: 1\ninput:\n  schema: object\noutput:\n  input_mapping: {{}}\nnodes: []\nedges:\n  - from: start\n    to: end\n"
        )
        .unwrap();
        let workflow = load_workflow(&yaml_file.path().to_path_buf()).unwrap();
        assert_eq!(workflow.id, "wf");
    }

    #[test]
    fn load_workflow_surfaces_a_missing_end_edge_as_an_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"id":"wf","version":1,"input":{{"schema":"object"}},"output":{{"input_mapping":{{}}}},"nodes":[],"edges":[]}}"#
        )
        .unwrap();
        let workflow = load_workflow(&file.path().to_path_buf()).unwrap();
        assert!(nebula_engine::compile(&workflow).is_err());
    }
}
