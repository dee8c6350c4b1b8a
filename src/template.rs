use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::GenerationError;

/// A single template from the catalog. Identity is the (language, name) pair.
#[derive(Debug, Clone)]
pub struct Template {
    pub language: String,
    pub name: String,
    pub body: String,
}

/// Builtin catalog served when no template directory exists on disk.
const BUILTIN_TEMPLATES: &[(&str, &str, &str)] = &[
    ("python", "class", include_str!("../templates/python/class.tmpl")),
    ("python", "module", include_str!("../templates/python/module.tmpl")),
    ("javascript", "module", include_str!("../templates/javascript/module.tmpl")),
];

/// File-backed template catalog, organized `{root}/{language}/{name}.ext`.
///
/// Lookups never cross language directories: asking for a python template
/// can only match files under `python/`. When the configured root does not
/// exist, the compiled-in builtin catalog is served with the same contract.
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Load the template `{language}/{name}` from the catalog.
    pub fn load(&self, language: &str, name: &str) -> Result<Template, GenerationError> {
        if self.root.is_dir() {
            self.load_from_dir(language, name)
        } else {
            debug!(
                "Template directory {} not found, using builtin catalog",
                self.root.display()
            );
            self.load_builtin(language, name)
        }
    }

    /// List the template names available for a language. Recomputed per call.
    pub fn list(&self, language: &str) -> Vec<String> {
        if self.root.is_dir() {
            let mut names: Vec<String> = WalkDir::new(self.root.join(language))
                .max_depth(1)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    entry
                        .path()
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                })
                .collect();
            names.sort();
            names.dedup();
            names
        } else {
            BUILTIN_TEMPLATES
                .iter()
                .filter(|(lang, _, _)| *lang == language)
                .map(|(_, name, _)| name.to_string())
                .collect()
        }
    }

    fn load_from_dir(&self, language: &str, name: &str) -> Result<Template, GenerationError> {
        let dir = self.root.join(language);
        for entry in WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().file_stem() == Some(OsStr::new(name)) {
                match fs::read_to_string(entry.path()) {
                    Ok(body) => {
                        return Ok(Template {
                            language: language.to_string(),
                            name: name.to_string(),
                            body,
                        });
                    }
                    Err(e) => {
                        warn!("Failed to read template {}: {}", entry.path().display(), e);
                    }
                }
            }
        }

        Err(GenerationError::TemplateNotFound {
            language: language.to_string(),
            name: name.to_string(),
        })
    }

    fn load_builtin(&self, language: &str, name: &str) -> Result<Template, GenerationError> {
        BUILTIN_TEMPLATES
            .iter()
            .find(|(lang, n, _)| *lang == language && *n == name)
            .map(|(lang, n, body)| Template {
                language: lang.to_string(),
                name: n.to_string(),
                body: body.to_string(),
            })
            .ok_or_else(|| GenerationError::TemplateNotFound {
                language: language.to_string(),
                name: name.to_string(),
            })
    }
}
