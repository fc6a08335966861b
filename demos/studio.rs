use argh::FromArgs;
use infernum_studio::{Capability, RunOutcome, StudioApp, StudioConfig};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

#[derive(FromArgs)]
/// Interactive terminal front end for the hosted models.
struct StudioArgs {
    /// also load the audio-to-text model
    #[argh(switch, short = 'a')]
    audio: bool,

    /// where generated images are written
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

const HELP: &str = "\
commands:
  select <object-detection|text-to-image|audio-to-text>
  browse <path>     choose an input file
  text <prompt>     type an input text
  run               run the selected model
  info              show the selected model
  clear             clear the output
  quit";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: StudioArgs = argh::from_env();

    let mut config = StudioConfig::from_env();
    if let Some(output) = args.output {
        config.output_path = output;
    }

    let mut capabilities = vec![Capability::ObjectDetection, Capability::TextToImage];
    if args.audio {
        capabilities.push(Capability::AudioToText);
    }
    let mut app = StudioApp::connect_with(&config, &capabilities)?;

    println!("Infernum Studio");
    println!("{HELP}");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => continue,
            "select" => match rest.parse::<Capability>() {
                Ok(capability) => println!("{}", app.select_model(capability)),
                Err(e) => println!("{e}"),
            },
            "browse" => println!("{}", app.browse(rest)),
            "text" => app.set_text(rest),
            "run" => match app.run() {
                RunOutcome::Completed { notice, .. } => {
                    if let Some(result) = app.last_result() {
                        println!("{result}");
                    }
                    println!("{notice}");
                }
                RunOutcome::Failed(notice) => println!("{notice}"),
            },
            "info" => println!("{}", app.info()),
            "clear" => println!("{}", app.clear_output()),
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            other => println!("unknown command {other:?}, type help"),
        }
    }

    Ok(())
}
