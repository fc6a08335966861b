use argh::FromArgs;
use infernum_studio::Capability;
use std::path::PathBuf;

mod messages;

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Client for the studio server
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "inference", "results" or "models"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Inference(InferenceCommand),
    Results(ResultsCommand),
    Models(ModelsCommand),
}

#[derive(FromArgs)]
/// Schedule a model invocation
#[argh(subcommand, name = "inference")]
struct InferenceCommand {
    /// model kind: object-detection, text-to-image or audio-to-text
    #[argh(option, short = 'm')]
    model: String,

    /// path of the input file
    #[argh(option, short = 'i')]
    path: Option<PathBuf>,

    /// the text prompt to use
    #[argh(option, short = 't')]
    prompt: Option<String>,
}

#[derive(FromArgs)]
/// Check invocation results of a model
#[argh(subcommand, name = "results")]
struct ResultsCommand {
    /// model kind: object-detection, text-to-image or audio-to-text
    #[argh(option, short = 'm')]
    model: String,
}

#[derive(FromArgs)]
/// List loaded models
#[argh(subcommand, name = "models")]
struct ModelsCommand {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let response = match args.command {
        ClientCommands::Inference(command) => {
            let model: Capability = command.model.parse()?;
            client
                .post(format!("http://{}/inference", addr))
                .json(&messages::InferenceRequest {
                    model,
                    prompt: command.prompt,
                    path: command.path,
                })
                .send()
                .await?
        }
        ClientCommands::Results(command) => {
            let model: Capability = command.model.parse()?;
            client
                .get(format!("http://{}/results/{}", addr, model))
                .send()
                .await?
        }
        ClientCommands::Models(_) => client.get(format!("http://{}/models", addr)).send().await?,
    };

    let result = response.json::<serde_json::Value>().await?;
    println!("Result: {}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
