use std::sync::Arc;

use anyhow::{bail, Context, Result};

use chaptertrans::client::mock::MockClient;
use chaptertrans::config::Config;
use chaptertrans::prefs::JsonFileStore;
use chaptertrans::view::{ChapterView, ControlsVisibility, LanguageToggleView};
use chaptertrans::{
    logger, AuthSession, AuthSnapshot, Axis, ChapterController, Credential, CredentialSource,
    HttpTransformClient, LanguageBroadcaster, TransformClient,
};

const USAGE: &str = "usage: chaptertrans [--offline] <chapter-id> <chapter-file> <personalize|translate|revert|urdu|english>";

#[derive(Clone, Copy, Debug)]
enum Action {
    Personalize,
    Translate,
    Revert,
    Urdu,
    English,
}

impl Action {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "personalize" => Action::Personalize,
            "translate" => Action::Translate,
            "revert" => Action::Revert,
            "urdu" => Action::Urdu,
            "english" => Action::English,
            other => bail!("unknown action {:?}\n{}", other, USAGE),
        })
    }
}

struct Args {
    offline: bool,
    chapter_id: String,
    chapter_file: String,
    action: Action,
}

fn parse_args() -> Result<Args> {
    let mut rest: Vec<String> = std::env::args().skip(1).collect();
    let offline = rest.first().map(|a| a == "--offline").unwrap_or(false);
    if offline {
        rest.remove(0);
    }
    let [chapter_id, chapter_file, action] = <[String; 3]>::try_from(rest)
        .map_err(|_| anyhow::anyhow!(USAGE))?;
    Ok(Args {
        offline,
        chapter_id,
        chapter_file,
        action: Action::parse(&action)?,
    })
}

fn session_from_env() -> AuthSession {
    match std::env::var("CHAPTERTRANS_TOKEN") {
        Ok(token) if !token.is_empty() => AuthSession::new(AuthSnapshot::signed_in(
            std::env::var("CHAPTERTRANS_USER").unwrap_or_else(|_| "reader".to_string()),
            Credential::new(token),
        )),
        _ => AuthSession::default(),
    }
}

async fn run<C: TransformClient>(client: C, args: Args, cfg: &Config) -> Result<()> {
    let session = session_from_env();
    let broadcaster = LanguageBroadcaster::open(Box::new(JsonFileStore::new(
        cfg.resolve(&cfg.preference_file),
    )));
    let original = std::fs::read_to_string(&args.chapter_file)
        .with_context(|| format!("reading {}", args.chapter_file))?;

    let ctl = ChapterController::with_timeout(
        Arc::new(client),
        args.chapter_id.clone(),
        original,
        cfg.request_timeout(),
    );
    ctl.attach(&broadcaster, Arc::new(session.clone()));
    let token = session.credential();

    let outcome = match args.action {
        Action::Personalize => Some(ctl.toggle_personalization(token.as_ref()).await),
        Action::Translate => Some(ctl.toggle_translation(token.as_ref()).await),
        Action::Revert => {
            ctl.revert_all();
            None
        }
        Action::Urdu | Action::English => {
            broadcaster.set_preference(matches!(args.action, Action::Urdu));
            // Let a broadcast-started translation settle before printing.
            while ctl.snapshot().pending_axis().is_some() {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            }
            None
        }
    };
    if let Some(Err(e)) = &outcome {
        log::info!("{} action ended with: {}", args.chapter_id, e);
        eprintln!("{}", e);
    }

    print_view(&ctl.view(&session.snapshot()), broadcaster.get_preference());
    Ok(())
}

fn print_view(view: &ChapterView, is_urdu: bool) {
    let toggle = LanguageToggleView::derive(is_urdu);
    println!("[language: {} | page {}]", toggle.label, toggle.page_direction);
    if view.controls == ControlsVisibility::Shown {
        let mut buttons = vec![view.personalize.label, view.translate.label];
        if view.show_revert {
            buttons.push("Revert to Original");
        }
        println!("[{}]", buttons.join(" | "));
    }
    if let Some(err) = &view.error {
        println!("! {}", err);
    }
    println!("--- {} ({}) ---", view.chapter_id, view.direction());
    println!("{}", view.content);
}

fn main() -> Result<()> {
    let cfg = Config::load();
    logger::init(&cfg.resolve(&cfg.log_file), log::LevelFilter::Debug);
    log::info!("starting with api {}", cfg.api_base_url);

    let args = parse_args()?;
    let rt = tokio::runtime::Runtime::new().context("tokio runtime")?;
    if args.offline {
        let client = MockClient::new()
            .always(Axis::Personalization, "(personalized) chapter body")
            .always(Axis::Translation, "(اردو) chapter body");
        rt.block_on(run(client, args, &cfg))
    } else {
        let client = HttpTransformClient::new(cfg.api_base_url.clone(), cfg.request_timeout())?;
        rt.block_on(run(client, args, &cfg))
    }
}
