//! Character-card import from PNG metadata.
//!
//! Cards are embedded as base64 JSON in a PNG `tEXt` chunk keyed `chara`
//! (spec v2) or `ccv3` (v3, which takes precedence when both exist).

use crate::Error;
use base64::Engine;
use serde::{Deserialize, Serialize};

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
const CARD_HOSTS: [&str; 2] = ["chub.ai", "characterhub.org"];

/// A parsed character card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterCard {
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub spec_version: Option<String>,
    #[serde(default)]
    pub data: Option<CharacterCardData>,
    /// The source PNG bytes, retained so callers can render the avatar
    /// without a second download.
    #[serde(skip)]
    pub png_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterCardData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default, rename = "first_mes")]
    pub first_message: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, rename = "mes_example")]
    pub message_examples: Option<String>,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub creator_notes: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub post_history_instructions: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub character_version: Option<String>,
    #[serde(default)]
    pub alternate_greetings: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Extract a character card from PNG bytes.
pub fn parse_character_card(png: &[u8]) -> Result<CharacterCard, Error> {
    if png.len() < 8 || png[..8] != PNG_SIGNATURE {
        return Err(Error::unsupported_import("not a PNG image"));
    }

    let mut chara = None;
    let mut ccv3 = None;
    let mut offset = 8;

    while offset + 8 <= png.len() {
        let length =
            u32::from_be_bytes([png[offset], png[offset + 1], png[offset + 2], png[offset + 3]])
                as usize;
        let chunk_type = &png[offset + 4..offset + 8];
        let data_start = offset + 8;
        let data_end = data_start + length;
        // Data plus the trailing CRC, which is not validated here.
        let chunk_end = data_end + 4;
        if chunk_end > png.len() {
            break;
        }

        if chunk_type == b"tEXt" {
            let chunk = &png[data_start..data_end];
            if let Some(nul) = chunk.iter().position(|&b| b == 0) {
                let key = String::from_utf8_lossy(&chunk[..nul]).to_lowercase();
                let value = chunk[nul + 1..].to_vec();
                match key.as_str() {
                    "chara" => chara = Some(value),
                    "ccv3" => ccv3 = Some(value),
                    _ => {}
                }
            }
        }

        offset = chunk_end;
    }

    let encoded = ccv3
        .or(chara)
        .ok_or_else(|| Error::unsupported_import("no character data in PNG"))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| Error::unsupported_import("character chunk is not valid base64"))?;

    let mut card: CharacterCard = serde_json::from_slice(&decoded)?;
    card.png_data = Some(png.to_vec());
    Ok(card)
}

/// Downloads character cards from chub.ai / characterhub.org pages.
pub struct ChubImporter {
    client: reqwest::Client,
}

impl Default for ChubImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChubImporter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch and parse the card behind a character page URL, e.g.
    /// `https://chub.ai/characters/Anonymous/some-card`.
    pub async fn fetch(&self, url: &str) -> Result<CharacterCard, Error> {
        let parsed = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let Some(host) = parsed.host_str() else {
            return Err(Error::unsupported_import("URL has no host"));
        };
        if !CARD_HOSTS.contains(&host) {
            return Err(Error::unsupported_import(format!(
                "unsupported import host `{host}`"
            )));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();
        let character_path = segments
            .iter()
            .position(|&s| s == "characters")
            .map(|idx| segments[idx + 1..].join("/"))
            .filter(|path| !path.is_empty())
            .ok_or_else(|| Error::unsupported_import("URL does not reference a character"))?;

        let download_url =
            format!("https://avatars.charhub.io/avatars/{character_path}/chara_card_v2.png");
        let response = self.client.get(&download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::server(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let mut card = parse_character_card(&bytes)?;
        // The embedded avatar field is almost always "none"; point it at the
        // canonical image instead.
        if let Some(data) = card.data.as_mut() {
            data.avatar = Some(download_url);
        }
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_with_text_chunks(chunks: &[(&str, &[u8])]) -> Vec<u8> {
        let mut png = PNG_SIGNATURE.to_vec();
        for (key, value) in chunks {
            let mut data = key.as_bytes().to_vec();
            data.push(0);
            data.extend_from_slice(value);
            png.extend_from_slice(&(data.len() as u32).to_be_bytes());
            png.extend_from_slice(b"tEXt");
            png.extend_from_slice(&data);
            png.extend_from_slice(&[0, 0, 0, 0]); // CRC is not validated
        }
        png.extend_from_slice(&0u32.to_be_bytes());
        png.extend_from_slice(b"IEND");
        png.extend_from_slice(&[0, 0, 0, 0]);
        png
    }

    fn encode_card(json: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .encode(json)
            .into_bytes()
    }

    #[test]
    fn test_parse_v2_card() {
        let json = r#"{"spec":"chara_card_v2","data":{"name":"Ada","first_mes":"Hello!"}}"#;
        let png = png_with_text_chunks(&[("chara", &encode_card(json))]);

        let card = parse_character_card(&png).unwrap();
        assert_eq!(card.spec.as_deref(), Some("chara_card_v2"));
        let data = card.data.unwrap();
        assert_eq!(data.name.as_deref(), Some("Ada"));
        assert_eq!(data.first_message.as_deref(), Some("Hello!"));
        assert!(card.png_data.is_some());
    }

    #[test]
    fn test_ccv3_takes_precedence() {
        let v2 = encode_card(r#"{"data":{"name":"old"}}"#);
        let v3 = encode_card(r#"{"data":{"name":"new"}}"#);
        let png = png_with_text_chunks(&[("chara", &v2), ("ccv3", &v3)]);

        let card = parse_character_card(&png).unwrap();
        assert_eq!(card.data.unwrap().name.as_deref(), Some("new"));
    }

    #[test]
    fn test_rejects_non_png() {
        assert!(matches!(
            parse_character_card(b"GIF89a"),
            Err(Error::UnsupportedImport(_))
        ));
    }

    #[test]
    fn test_rejects_png_without_card() {
        let png = png_with_text_chunks(&[("comment", b"no card here")]);
        assert!(matches!(
            parse_character_card(&png),
            Err(Error::UnsupportedImport(_))
        ));
    }

    #[tokio::test]
    async fn test_importer_rejects_unknown_host() {
        let importer = ChubImporter::new();
        assert!(matches!(
            importer.fetch("https://example.com/characters/a/b").await,
            Err(Error::UnsupportedImport(_))
        ));
    }
}
