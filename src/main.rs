use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use dom_a11y::{Config, DomContext, HostTrait, MemoryHost, Politeness};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("dom-a11y")
        .about("Run focus, scroll and announcement helpers against a document")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .value_name("FILE")
                .help("Load the document from an HTML file"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("Open the document in headless Chrome"),
        )
        .group(
            ArgGroup::new("source")
                .args(["html", "url"])
                .required(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("hash")
                .about("Resolve a location hash to an element")
                .arg(Arg::new("hash").required(true).allow_hyphen_values(true)),
        )
        .subcommand(
            Command::new("query")
                .about("Resolve a selector to an element")
                .arg(Arg::new("selector").required(true)),
        )
        .subcommand(
            Command::new("focus")
                .about("Move focus to an element")
                .arg(Arg::new("selector").required(true)),
        )
        .subcommand(
            Command::new("focus-invalid")
                .about("Focus the first invalid control of a form")
                .arg(Arg::new("form").required(true))
                .arg(
                    Arg::new("invalid")
                        .long("invalid")
                        .value_name("SELECTOR")
                        .default_value("[aria-invalid=\"true\"]"),
                )
                .arg(
                    Arg::new("group")
                        .long("group")
                        .value_name("SELECTOR")
                        .default_value(".form-group"),
                ),
        )
        .subcommand(
            Command::new("title")
                .about("Set the document title")
                .arg(Arg::new("text").required(true)),
        )
        .subcommand(
            Command::new("announce")
                .about("Announce text through a live region")
                .arg(Arg::new("text").required(true))
                .arg(
                    Arg::new("assertive")
                        .long("assertive")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("reduced-motion").about("Report the reduced motion preference"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => Config::default(),
    };

    let output = if let Some(path) = matches.get_one::<String>("html") {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path))?;
        info!("Loaded {} ({} bytes)", path, html.len());
        run(DomContext::new(MemoryHost::parse(&html), config), &matches).await?
    } else if let Some(url) = matches.get_one::<String>("url") {
        run_in_chrome(url, config, &matches).await?
    } else {
        bail!("either --html or --url is required");
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(feature = "chrome")]
async fn run_in_chrome(url: &str, config: Config, matches: &ArgMatches) -> anyhow::Result<Value> {
    let host = dom_a11y::ChromeHost::launch(&config.host).await?;
    info!("Opening {}", url);
    host.navigate(url).await?;
    run(DomContext::new(host, config), matches).await
}

#[cfg(not(feature = "chrome"))]
async fn run_in_chrome(_url: &str, _config: Config, _matches: &ArgMatches) -> anyhow::Result<Value> {
    bail!("--url needs the `chrome` feature")
}

async fn run<B: HostTrait + 'static>(ctx: DomContext<B>, matches: &ArgMatches) -> anyhow::Result<Value> {
    let output = match matches.subcommand() {
        Some(("hash", args)) => {
            let hash = required(args, "hash")?;
            let element = ctx.element_from_hash(hash).await;
            json!({ "element": describe(&ctx, element.as_ref()).await })
        }
        Some(("query", args)) => {
            let element = ctx.element_from_target(required(args, "selector")?).await;
            json!({ "element": describe(&ctx, element.as_ref()).await })
        }
        Some(("focus", args)) => {
            let focused = ctx.focus_element(required(args, "selector")?).await;
            let active = ctx.host().active_element().await.ok().flatten();
            json!({
                "focused": focused,
                "active": describe(&ctx, active.as_ref()).await,
            })
        }
        Some(("focus-invalid", args)) => {
            let outcome = ctx
                .focus_invalid_form(
                    required(args, "form")?,
                    required(args, "invalid")?,
                    required(args, "group")?,
                )
                .await;
            let active = ctx.host().active_element().await.ok().flatten();
            json!({
                "outcome": outcome,
                "active": describe(&ctx, active.as_ref()).await,
            })
        }
        Some(("title", args)) => {
            let outcome = ctx.set_title(required(args, "text")?).await;
            json!({
                "outcome": outcome,
                "title": ctx.host().title().await.ok(),
            })
        }
        Some(("announce", args)) => {
            let politeness = if args.get_flag("assertive") {
                Politeness::Assertive
            } else {
                ctx.config().announce.politeness
            };
            let outcome = ctx.announce_with(required(args, "text")?, politeness).await;
            json!({ "outcome": outcome, "politeness": politeness })
        }
        Some(("reduced-motion", _)) => {
            json!({ "reduced_motion": ctx.prefers_reduced_motion().await })
        }
        Some((other, _)) => bail!("unknown command: {}", other),
        None => bail!("no command given"),
    };
    Ok(output)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{}>", name))
}

async fn describe<B: HostTrait + 'static>(ctx: &DomContext<B>, element: Option<&B::ElementHandle>) -> Value {
    let Some(element) = element else {
        return Value::Null;
    };
    match ctx.host().element_info(element).await {
        Ok(info) => serde_json::to_value(info).unwrap_or(Value::Null),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_a_source() {
        assert!(cli().try_get_matches_from(["dom-a11y", "query", "main"]).is_err());
        assert!(cli()
            .try_get_matches_from(["dom-a11y", "--html", "a.html", "--url", "b", "query", "main"])
            .is_err());
    }

    #[test]
    fn test_focus_invalid_defaults() {
        let matches = cli()
            .try_get_matches_from(["dom-a11y", "--html", "page.html", "focus-invalid", "#signup"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(required(args, "invalid").unwrap(), "[aria-invalid=\"true\"]");
        assert_eq!(required(args, "group").unwrap(), ".form-group");
    }

    #[tokio::test]
    async fn test_run_query_against_memory_host() {
        let matches = cli()
            .try_get_matches_from(["dom-a11y", "--html", "page.html", "query", "#main"])
            .unwrap();
        let ctx = DomContext::new(
            MemoryHost::parse(r#"<main id="main">Hello</main>"#),
            Config::default(),
        );

        let output = run(ctx, &matches).await.unwrap();
        assert_eq!(output["element"]["tag_name"], "main");
        assert_eq!(output["element"]["text_content"], "Hello");
    }

    #[tokio::test]
    async fn test_run_focus_reports_active_element() {
        let matches = cli()
            .try_get_matches_from(["dom-a11y", "--html", "page.html", "focus", "h1"])
            .unwrap();
        let ctx = DomContext::new(MemoryHost::parse("<h1 id=\"top-heading\">Hi</h1>"), Config::default());

        let output = run(ctx, &matches).await.unwrap();
        assert_eq!(output["focused"], true);
        assert_eq!(output["active"]["element_id"], "top-heading");
    }

    #[tokio::test]
    async fn test_run_focus_invalid_uses_form_group_wrappers() {
        let matches = cli()
            .try_get_matches_from(["dom-a11y", "--html", "page.html", "focus-invalid", "#signup"])
            .unwrap();
        let ctx = DomContext::new(
            MemoryHost::parse(
                r#"<form id="signup"><div class="form-group"><input id="email" aria-invalid="true"></div></form>"#,
            ),
            Config::default(),
        );

        let output = run(ctx, &matches).await.unwrap();
        assert_eq!(output["outcome"], "Applied");
        assert_eq!(output["active"]["element_id"], "email");
    }
}
