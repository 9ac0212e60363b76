//! Post models as handed to templates and the JSON endpoint

use serde::{Deserialize, Deserializer, Serialize};

use crate::cms::{CmsError, Document};
use crate::helpers::{count_words, reading_minutes, DateFormatter};

/// Fields of a post listed on the home page and the pagination endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryData {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
}

/// A post as it appears in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: Option<String>,
    /// Formatted publication date, `None` when the CMS has none
    pub first_publication_date: Option<String>,
    pub data: SummaryData,
}

/// Banner image of a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

/// A paragraph of a section body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyBlock {
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
}

/// A headed section of a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    #[serde(deserialize_with = "null_as_default")]
    pub heading: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: Vec<BodyBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailData {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub banner: Banner,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: Vec<ContentSection>,
}

/// A full post for the detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: DetailData,
    pub reading_minutes: usize,
}

impl PostSummary {
    pub fn from_document(document: Document, dates: &DateFormatter) -> Result<Self, CmsError> {
        let data: SummaryData = serde_json::from_value(document.data)?;
        Ok(Self {
            uid: document.uid,
            first_publication_date: format_publication(
                document.first_publication_date.as_deref(),
                dates,
            ),
            data,
        })
    }
}

impl PostDetail {
    pub fn from_document(document: Document, dates: &DateFormatter) -> Result<Self, CmsError> {
        let data: DetailData = serde_json::from_value(document.data)?;
        let reading_minutes = reading_minutes(data.word_count());
        Ok(Self {
            uid: document.uid,
            first_publication_date: format_publication(
                document.first_publication_date.as_deref(),
                dates,
            ),
            data,
            reading_minutes,
        })
    }
}

impl DetailData {
    /// Words in every heading and body block
    pub fn word_count(&self) -> usize {
        self.content
            .iter()
            .map(|section| {
                count_words(&section.heading)
                    + section
                        .body
                        .iter()
                        .map(|block| count_words(&block.text))
                        .sum::<usize>()
            })
            .sum()
    }
}

/// Prismic sends `null` for empty fields; read those as the default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn format_publication(raw: Option<&str>, dates: &DateFormatter) -> Option<String> {
    let raw = raw?;
    let formatted = dates.format(raw);
    if formatted.is_none() {
        tracing::warn!("Unparseable publication date: {}", raw);
    }
    formatted
}
