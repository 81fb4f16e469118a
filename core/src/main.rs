use std::env;
use std::process;

use theme_switch::adapters::memory::{
    InMemoryDomainDirectory, InMemorySettingsStore, InMemoryThemeDirectory,
};
use theme_switch::service::{FormValues, ThemeSwitchService};
use theme_switch::view::SettingsView;
use theme_switch::{Domain, DomainId, Theme, ThemeDefaults};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  theme-switch render [--domain <id>=<hostname>]...\n  theme-switch submit [--domain <id>=<hostname>]... <key>=<theme>...\n\nNotes:\n  - This demo CLI uses in-memory storage with the bartik/seven/stark themes;\n    data is not persisted across runs.",
        theme_switch::about()
    );
}

fn split_pair(arg: &str) -> Result<(&str, &str), String> {
    arg.split_once('=')
        .ok_or_else(|| format!("expected <key>=<value>, got '{}'", arg))
}

fn print_view(view: &SettingsView) {
    match view {
        SettingsView::Empty { message } => println!("{}", message.to_html()),
        SettingsView::Editable(form) => {
            for group in &form.groups {
                println!("{}", group.title);
                for field in group.fields() {
                    println!("  {} [{}] = {}", field.title, field.name, field.default_value);
                }
            }
        }
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    // Parse --domain flags; everything else is a submitted value
    let rest: Vec<String> = args.collect();
    let mut domains = Vec::new();
    let mut values = FormValues::new();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--domain" => {
                if i + 1 >= rest.len() {
                    return Err("--domain requires <id>=<hostname>".into());
                }
                let (id, hostname) = split_pair(&rest[i + 1])?;
                let id = DomainId::new(id).map_err(|e| e.to_string())?;
                domains.push(Domain::new(id, hostname));
                i += 2;
            }
            other => {
                let (key, theme) = split_pair(other)?;
                values.insert(key.to_string(), theme.to_string());
                i += 1;
            }
        }
    }

    let themes = InMemoryThemeDirectory::with_themes(vec![
        Theme::new("bartik", "Bartik"),
        Theme::new("seven", "Seven"),
        Theme::new("stark", "Stark"),
    ]);
    let svc = ThemeSwitchService::new(
        InMemorySettingsStore::new(),
        InMemoryDomainDirectory::with_domains(domains),
        themes,
        ThemeDefaults::new("bartik", "seven"),
    );

    match cmd.as_str() {
        "render" => {
            let view = svc.render().map_err(|e| format!("render failed: {}", e))?;
            print_view(&view);
            Ok(())
        }
        "submit" => {
            if svc
                .render()
                .map_err(|e| format!("render failed: {}", e))?
                .is_empty()
            {
                return Err("no domains configured; pass --domain <id>=<hostname>".into());
            }
            let outcome = svc
                .submit(&values)
                .map_err(|e| format!("submit failed: {}", e))?;
            println!(
                "saved {} domain(s), {} key(s) reset to default",
                outcome.domains_written, outcome.keys_cleared
            );
            let view = svc.render().map_err(|e| format!("render failed: {}", e))?;
            print_view(&view);
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
