//! Conversion output.
//!
//! A [`ConvOutput`] bundles the rendered RTL text, any auxiliary data
//! files it references by name (memory preload contents), and the frozen
//! [`Namespace`] so callers can cross-reference original signals to the
//! emitted identifiers.

use crate::namespace::Namespace;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// The result of one conversion: main source, auxiliary files, namespace.
#[derive(Debug)]
pub struct ConvOutput {
    /// The rendered RTL source text.
    pub main_source: String,
    /// Auxiliary data files referenced by name from the main source.
    pub data_files: BTreeMap<String, String>,
    /// The signal/special naming used by the rendered text.
    pub namespace: Namespace,
}

impl ConvOutput {
    /// Creates an empty output carrying the given namespace.
    pub fn new(namespace: Namespace) -> Self {
        Self {
            main_source: String::new(),
            data_files: BTreeMap::new(),
            namespace,
        }
    }

    /// Registers an auxiliary data file and returns the name it was
    /// stored under, which differs from `name` if that name was already
    /// taken by different contents.
    pub fn add_data_file(&mut self, name: &str, contents: String) -> String {
        if self.data_files.get(name).is_none() {
            self.data_files.insert(name.to_string(), contents);
            return name.to_string();
        }
        if self.data_files.get(name) == Some(&contents) {
            return name.to_string();
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
            None => (name.to_string(), String::new()),
        };
        let mut counter = 1u32;
        loop {
            let candidate = format!("{stem}_{counter}{ext}");
            if !self.data_files.contains_key(&candidate) {
                self.data_files.insert(candidate.clone(), contents);
                return candidate;
            }
            counter += 1;
        }
    }

    /// Writes the main source as `main_name` plus every data file into
    /// `dir`.
    pub fn write(&self, dir: &Path, main_name: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut main = std::fs::File::create(dir.join(main_name))?;
        main.write_all(self.main_source.as_bytes())?;
        for (name, contents) in &self.data_files {
            let mut file = std::fs::File::create(dir.join(name))?;
            file.write_all(contents.as_bytes())?;
        }
        Ok(())
    }
}
