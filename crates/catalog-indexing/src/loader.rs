use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use catalog_core::error::{Error, Result};
use catalog_core::types::Product;

use crate::indexer::{IndexUpdater, Indexer};

/// Loads products from `*.json` files below a directory. Each file holds a
/// JSON array of products.
pub struct ProductFileLoader {
    data_dir: PathBuf,
    show_progress: bool,
}

impl ProductFileLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), show_progress: false }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn list_json_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.data_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "json"))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    pub fn read_file(path: &Path) -> Result<Vec<Product>> {
        let bytes = fs::read(path).map_err(Error::backend)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Validation(format!("{}: {e}", path.display())))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

impl IndexUpdater for ProductFileLoader {
    fn index(&self, indexer: &mut Indexer) -> Result<()> {
        let files = self.list_json_files();
        if files.is_empty() {
            tracing::warn!(dir = %self.data_dir.display(), "No product files found");
            return Ok(());
        }
        let pb = self.progress_bar(files.len());
        for file in &files {
            pb.set_message(file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
            match Self::read_file(file) {
                Ok(products) => {
                    tracing::debug!(file = %file.display(), products = products.len(), "Product file read");
                    for product in products {
                        indexer.update_product_and_category(product)?;
                    }
                }
                Err(e) => tracing::warn!(file = %file.display(), error = %e, "Skipping unreadable product file"),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(())
    }
}
