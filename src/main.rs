use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use ustache::template_loader::load_from_path;
use ustache::{Template, TemplateOptions};

const USAGE: &str = "usage: ustache <template-file> [data.json]";

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let template_path = args.next().context(USAGE)?;
    let data: serde_json::Value = match args.next() {
        Some(data_path) => {
            let raw = fs::read_to_string(&data_path)
                .with_context(|| format!("failed to read data file: {}", data_path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON in {}", data_path))?
        }
        None => serde_json::Value::Object(Default::default()),
    };

    let path = Path::new(&template_path);
    // Sibling templates become available as partials.
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let count = load_from_path(dir)?;
    info!(count, dir = %dir.display(), "partials loaded");

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let template = Template::from_reader(file, TemplateOptions::new().name(name))
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    template.render(&mut out, &data)?;
    out.flush()?;
    Ok(())
}
