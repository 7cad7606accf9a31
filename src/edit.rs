use std::collections::BTreeMap;

use serde::Serialize;

use crate::program::MethodSignature;

/// Declaration receiving a qualifier.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum DeclarationSite {
    Return {
        method: MethodSignature,
    },
    Parameter {
        method: MethodSignature,
        index: usize,
        name: String,
    },
}

impl DeclarationSite {
    pub(crate) fn method(&self) -> &MethodSignature {
        match self {
            DeclarationSite::Return { method } | DeclarationSite::Parameter { method, .. } => method,
        }
    }
}

/// Insertion of the qualifier into one declared type.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct AnnotationEdit {
    pub(crate) file: String,
    pub(crate) site: DeclarationSite,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) line: Option<u32>,
    /// Byte offset of the insertion; absent when the model carries no offset
    /// for the declared type.
    pub(crate) offset: Option<usize>,
    /// Text inserted at `offset`.
    pub(crate) insert: String,
    /// Declared type as it reads after the insertion.
    pub(crate) annotated_type: String,
}

/// Import declaration added to a file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct ImportEdit {
    pub(crate) file: String,
    pub(crate) offset: Option<usize>,
    pub(crate) insert: String,
    pub(crate) qualified_name: String,
}

/// Edits of one file, annotations in source order.
#[derive(Debug, Default)]
pub(crate) struct FileEdits<'a> {
    pub(crate) annotations: Vec<&'a AnnotationEdit>,
    pub(crate) import: Option<&'a ImportEdit>,
}

/// Every edit produced by one engine run.
#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct EditSet {
    pub(crate) annotations: Vec<AnnotationEdit>,
    pub(crate) imports: Vec<ImportEdit>,
}

impl EditSet {
    /// Sort edits deterministically and collapse duplicates.
    pub(crate) fn normalize(&mut self) {
        self.annotations.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.offset.cmp(&b.offset))
                .then_with(|| a.site.cmp(&b.site))
        });
        self.annotations
            .dedup_by(|a, b| a.file == b.file && a.site == b.site);
        self.imports.sort_by(|a, b| a.file.cmp(&b.file));
        self.imports.dedup_by(|a, b| a.file == b.file);
    }

    /// Edits grouped by file in deterministic order.
    pub(crate) fn by_file(&self) -> BTreeMap<&str, FileEdits<'_>> {
        let mut map: BTreeMap<&str, FileEdits<'_>> = BTreeMap::new();
        for edit in &self.annotations {
            map.entry(edit.file.as_str()).or_default().annotations.push(edit);
        }
        for edit in &self.imports {
            map.entry(edit.file.as_str()).or_default().import = Some(edit);
        }
        for edits in map.values_mut() {
            edits.annotations.sort_by_key(|edit| edit.offset);
        }
        map
    }
}

/// Text rewriting is left to the caller; tests use it to check placements.
#[cfg(test)]
impl EditSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.imports.is_empty()
    }

    /// Apply the edits of `file` to its original text.
    pub(crate) fn apply(&self, file: &str, original: &str) -> anyhow::Result<String> {
        let mut insertions: Vec<(usize, &str)> = Vec::new();
        for edit in self.annotations.iter().filter(|edit| edit.file == file) {
            let Some(offset) = edit.offset else {
                anyhow::bail!("edit for {:?} in {file} has no source offset", edit.site);
            };
            insertions.push((offset, &edit.insert));
        }
        for edit in self.imports.iter().filter(|edit| edit.file == file) {
            let Some(offset) = edit.offset else {
                anyhow::bail!("import for {file} has no source offset");
            };
            insertions.push((offset, &edit.insert));
        }
        if let Some((offset, _)) = insertions
            .iter()
            .find(|(offset, _)| !original.is_char_boundary(*offset))
        {
            anyhow::bail!("offset {offset} is outside {file} (len={})", original.len());
        }
        // Back to front keeps earlier offsets valid. At equal offsets the
        // import is inserted last and so lands in front.
        insertions.sort_by(|a, b| b.0.cmp(&a.0));
        let mut text = original.to_string();
        for (offset, insert) in insertions {
            text.insert_str(offset, insert);
        }
        Ok(text)
    }
}
