/*!
Here we go!

```text
schoolrec [ CONFIG_FILE ]
```

`CONFIG_FILE` defaults to `schoolrec.toml`; if it doesn't exist, the
built-in defaults are used.
*/
use std::path::Path;
use std::sync::Arc;

use simplelog::{ColorChoice, TerminalMode, TermLogger};
use tokio::sync::RwLock;

use schoolrec::config::{self, Cfg};
use schoolrec::inter;

static DEFAULT_CONFIG_FILE: &str = "schoolrec.toml";

fn read_cfg() -> Result<Cfg, String> {
    let path = std::env::args().nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_owned());
    let path = Path::new(&path);

    if path.exists() {
        log::info!("Reading configuration from {}.", path.display());
        Cfg::from_file(path)
    } else {
        log::warn!(
            "Config file {} not found; using default configuration.",
            path.display()
        );
        Ok(Cfg::default())
    }
}

async fn run() -> Result<(), String> {
    let cfg = read_cfg()?;
    let glob = config::load_configuration(cfg)?;

    inter::init(&glob.templates_dir)?;

    let addr = glob.addr;
    let static_dir = glob.static_dir.clone();
    let glob = Arc::new(RwLock::new(glob));

    let app = inter::router(glob, static_dir);

    log::info!("Listening on {}", &addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| format!("Server error: {}", &e))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("schoolrec")
        .build();
    if let Err(e) = TermLogger::init(
        schoolrec::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ) {
        eprintln!("Unable to start logging: {}", &e);
    }
    log::info!("Logging started.");

    if let Err(e) = run().await {
        log::error!("{}", &e);
        eprintln!("{}", &e);
        std::process::exit(1);
    }
}
