use crate::config::Difficulty;
use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::error::Error;

static CORPUS_DIR: Dir = include_dir!("src/text/corpora");

/// An embedded word list for one difficulty tier.
#[derive(Deserialize, Clone, Debug)]
pub struct Corpus {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Corpus {
    pub fn load(difficulty: Difficulty) -> Result<Self, Box<dyn Error>> {
        let file_name = format!("{difficulty}.json");
        let file = CORPUS_DIR
            .get_file(&file_name)
            .ok_or_else(|| format!("corpus file not found: {file_name}"))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| format!("corpus file is not utf-8: {file_name}"))?;
        let corpus: Corpus = serde_json::from_str(contents)?;
        Ok(corpus)
    }
}
