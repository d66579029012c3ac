use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Product identifier assigned by the API.
///
/// Opaque to the client. The API may send it as a number or a string; both
/// are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        text_or_number(deserializer).map(Self)
    }
}

/// Image attached to a product.
///
/// On the wire both variants travel as the single string field `image_url`;
/// embedded data is a `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Link to an image hosted elsewhere.
    Url(String),
    /// The image itself, as a data URL.
    EmbeddedData(String),
}

impl ImageRef {
    /// Classify a wire value.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.starts_with("data:") {
            ImageRef::EmbeddedData(raw)
        } else {
            ImageRef::Url(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Url(s) | ImageRef::EmbeddedData(s) => s,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, ImageRef::EmbeddedData(_))
    }

    /// Media type of embedded data (`image/png` for `data:image/png;base64,...`).
    pub fn media_type(&self) -> Option<&str> {
        match self {
            ImageRef::EmbeddedData(s) => s
                .strip_prefix("data:")
                .and_then(|rest| rest.split([';', ',']).next())
                .filter(|m| !m.is_empty()),
            ImageRef::Url(_) => None,
        }
    }

    /// Short form for listings; data URLs are far too long to print.
    pub fn summary(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::EmbeddedData(data) => format!(
                "<embedded {}, {} bytes>",
                self.media_type().unwrap_or("data"),
                data.len()
            ),
        }
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ImageRef::parse)
    }
}

/// Product fields as entered in a form, ready to send.
///
/// `price` and `stock` stay exactly as typed; the API validates them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
    #[serde(rename = "image_url", skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl ProductDraft {
    /// Draft prefilled from an existing record, for editing.
    pub fn from_record(record: &ProductRecord) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            price: record.price.clone(),
            stock: record.stock.clone(),
            image: record.image.clone(),
        }
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "text_number_or_null")]
    pub price: String,
    #[serde(default, deserialize_with = "text_number_or_null")]
    pub stock: String,
    #[serde(
        rename = "image_url",
        default,
        deserialize_with = "optional_image",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<ImageRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(Number),
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match TextOrNumber::deserialize(deserializer) {
        Ok(TextOrNumber::Text(s)) => Ok(s),
        Ok(TextOrNumber::Number(n)) => Ok(n.to_string()),
        Err(_) => Err(de::Error::custom("expected a string or a number")),
    }
}

/// Like [`text_or_number`], but `null` reads as an empty string.
fn text_number_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Option::<TextOrNumber>::deserialize(deserializer) {
        Ok(Some(TextOrNumber::Text(s))) => Ok(s),
        Ok(Some(TextOrNumber::Number(n))) => Ok(n.to_string()),
        Ok(None) => Ok(String::new()),
        Err(_) => Err(de::Error::custom("expected a string, a number or null")),
    }
}

fn optional_image<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ImageRef>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(ImageRef::parse))
}
