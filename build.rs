// build.rs

//! Generates the `t!` translation macro from `locales/<lang>.toml`.
//!
//! Language selection: a `lang_*` feature, else `ARGOT_LANG`, else `en`.
//! Keys missing from the chosen language fall back to `locales/en.toml`; a key
//! missing from both is a compile error at the `t!` call site.

use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

type Translations = BTreeMap<String, String>;

fn selected_language() -> String {
    let mut from_features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    from_features.sort();

    match from_features.first() {
        Some(first) => {
            if from_features.len() > 1 {
                println!(
                    "cargo:warning=Multiple language features enabled ({from_features:?}). Using '{first}'."
                );
            }
            first.clone()
        }
        None => env::var("ARGOT_LANG").unwrap_or_else(|_| "en".to_string()),
    }
}

fn load(path: &str) -> Result<Translations, Box<dyn Error>> {
    let content = fs::read_to_string(path).map_err(|e| format!("reading {path}: {e}"))?;
    let parsed = toml::from_str(&content).map_err(|e| format!("parsing {path}: {e}"))?;
    Ok(parsed)
}

fn render_macro(translations: &Translations) -> String {
    let mut code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in translations {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        code.push_str(&format!("    (\"{key}\") => {{ \"{escaped}\" }};\n"));
    }
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    code.push('}');
    code
}

fn main() -> Result<(), Box<dyn Error>> {
    let lang = selected_language();
    println!("cargo:rustc-env=ARGOT_LANG_EFFECTIVE={lang}");
    println!("cargo:rerun-if-env-changed=ARGOT_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let mut translations = load("locales/en.toml")?;
    if lang != "en" {
        let path = format!("locales/{lang}.toml");
        if Path::new(&path).exists() {
            translations.extend(load(&path)?);
        } else {
            println!("cargo:warning=Language file '{path}' not found. Falling back to 'en'.");
        }
    }

    let out_dir = env::var("OUT_DIR")?;
    fs::write(Path::new(&out_dir).join("translations.rs"), render_macro(&translations))?;
    Ok(())
}
