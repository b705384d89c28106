use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use peon_core::audio::{PlaybackRequest, RelayNotice, create_backend};
use peon_core::context::{PeonConfig, PeonConfigExt};
use peon_core::pack::list_packs;
use peon_core::sound::SoundSelector;
use peon_types::Category;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::CliContext;

const PREVIEW_GAP: Duration = Duration::from_millis(1500);

pub fn show_packs(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.load_config()?;
    let packs_dir = config.packs_dir();
    let packs = list_packs(&packs_dir);

    if packs.is_empty() {
        println!("No sound packs found in {}", packs_dir.display());
        return Ok(());
    }

    println!("  {:<20} {:<30} Directory", "Id", "Name");
    println!("{}", "-".repeat(80));
    for pack in &packs {
        let marker = if pack.id == config.pack { "*" } else { " " };
        println!("{marker} {:<20} {:<30} {}", pack.id, pack.name, pack.dir.display());
    }

    if !packs.iter().any(|pack| pack.id == config.pack) {
        println!("\nConfigured pack \"{}\" is not installed", config.pack);
    }
    Ok(())
}

/// Make `id` the active pack, if it is installed
pub fn use_pack(ctx: &CliContext, id: &str) -> Result<(), String> {
    let mut config = ctx.load_config()?;
    let packs_dir = config.packs_dir();
    let packs = list_packs(&packs_dir);

    let Some(pack) = packs.iter().find(|pack| pack.id == id) else {
        let known: Vec<&str> = packs.iter().map(|pack| pack.id.as_str()).collect();
        return Err(if known.is_empty() {
            format!("Sound pack \"{id}\" not found; no packs in {}", packs_dir.display())
        } else {
            format!("Sound pack \"{id}\" not found (installed: {})", known.join(", "))
        });
    };

    config.pack = pack.id.clone();
    save(ctx, &config)?;
    println!("Using {} ({})", pack.name, pack.id);
    Ok(())
}

/// Enable or disable one category
pub fn set_category(ctx: &CliContext, category: Category, enabled: bool) -> Result<(), String> {
    let mut config = ctx.load_config()?;
    config.sounds.set(category, enabled);
    save(ctx, &config)?;
    println!("{category} {}", if enabled { "on" } else { "off" });
    Ok(())
}

/// Persist to the file the daemon watches, so a running daemon picks it up
fn save(ctx: &CliContext, config: &PeonConfig) -> Result<(), String> {
    let path = ctx.config_path()?;
    config
        .save_to(&path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Play one category, or every enabled one, through the configured backend
pub async fn preview(ctx: &CliContext, category: Option<Category>) -> Result<(), String> {
    let config = ctx.load_config()?;
    let mut selector = SoundSelector::new(&config);
    let Some(pack) = selector.active_pack() else {
        return Err(format!("Sound pack \"{}\" not found", config.pack));
    };
    println!("Previewing {} ({})", pack.name, pack.id);

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let mut backend = create_backend(ctx.is_remote(&config), &config, Some(notice_tx));

    let categories: Vec<Category> = match category {
        Some(category) => vec![category],
        None => Category::ALL
            .into_iter()
            .filter(|c| config.is_category_enabled(*c))
            .collect(),
    };

    for category in categories {
        match selector.pick_sound(category, &config) {
            Some(path) => {
                println!("{:<12} {}", category, path.display());
                backend.play(PlaybackRequest::new(path, config.effective_volume()));
            }
            None if !config.is_category_enabled(category) => {
                println!("{category:<12} (disabled)");
                continue;
            }
            None => {
                println!("{category:<12} (no sound)");
                continue;
            }
        }

        while let Ok(notice) = notice_rx.try_recv() {
            match notice {
                RelayNotice::SurfaceReady { url } => println!("Relay page: {url}"),
                RelayNotice::AutoplayBlocked { url } => {
                    println!("Autoplay blocked, click the page at {url}")
                }
            }
        }
        sleep(PREVIEW_GAP).await;
    }

    backend.dispose();
    Ok(())
}

/// Write one signal record the way a hook does
pub fn emit(ctx: &CliContext, category: Category) -> Result<(), String> {
    let config = ctx.load_config()?;
    let path = config.event_file_path();
    let occurred_at = chrono::Utc::now().timestamp_millis();

    write_signal(&path, occurred_at, category)
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    println!("{occurred_at} {category} -> {}", path.display());
    Ok(())
}

/// Replace the signal file atomically: write a sibling temp file, then rename
pub fn write_signal(path: &Path, occurred_at: i64, category: Category) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "signal path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp = path.with_file_name(tmp_name);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp)?;
    file.write_all(format!("{occurred_at} {category}\n").as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

pub fn show_config(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.load_config()?;
    match ctx.config_path() {
        Ok(path) => println!("# {}", path.display()),
        Err(e) => println!("# config location unknown: {e}"),
    }
    let rendered = toml::to_string_pretty(&config).map_err(|e| e.to_string())?;
    println!("{rendered}");

    print_resolved(&config, ctx);
    Ok(())
}

fn print_resolved(config: &PeonConfig, ctx: &CliContext) {
    println!("# resolved");
    println!("#   packs directory: {}", config.packs_dir().display());
    println!("#   signal file:     {}", config.event_file_path().display());
    println!("#   volume:          {}", config.effective_volume());
    println!(
        "#   delivery:        {}",
        if ctx.is_remote(config) { "relay" } else { "direct" }
    );
}
