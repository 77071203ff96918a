//! IGDB v4 metadata adapter.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::backends::{MetadataService, RawGame};
use crate::reference_cache::Vocabulary;

pub const DEFAULT_API_BASE_URL: &str = "https://api.igdb.com/v4";
const SEARCH_FIELDS: &str = "name,summary,genres,keywords,rating";

/// IGDB adapter backed by `ureq`.
pub struct IgdbApi {
    http_client: ureq::Agent,
    api_base_url: String,
    client_id: String,
    access_token: String,
}

impl IgdbApi {
    /// Creates an adapter authenticated with a Twitch app access token.
    pub fn new(api_base_url: &str, client_id: &str, access_token: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .timeout_write(Duration::from_secs(15))
            .build();
        Self {
            http_client,
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn escape_query_string(value: &str) -> String {
        value.replace('\\', "\\\\").replace('"', "\\\"")
    }

    fn search_query(text: &str, limit: u32) -> String {
        format!(
            "search \"{}\";\nfields {SEARCH_FIELDS};\nlimit {limit};",
            Self::escape_query_string(text)
        )
    }

    fn lookup_query(ids: &[u64]) -> String {
        let id_list = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("where id = ({id_list});\nfields name;\nlimit {};", ids.len())
    }

    fn websites_query(game_id: u64, category: u32) -> String {
        format!("where game = {game_id} & category = {category};\nfields url;")
    }

    fn post_query(&self, endpoint: &str, body: &str) -> Result<Value, String> {
        let url = format!("{}/{endpoint}", self.api_base_url);
        debug!("IGDB POST {url}: {body:?}");
        let response = self
            .http_client
            .post(&url)
            .set("Client-ID", &self.client_id)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
            .send_string(body)
            .map_err(|err| format!("IGDB request failed ({endpoint}): {err}"))?;
        response
            .into_json()
            .map_err(|err| format!("IGDB response parse failed ({endpoint}): {err}"))
    }

    fn array_items(value: &Value) -> &[Value] {
        value.as_array().map(Vec::as_slice).unwrap_or_default()
    }

    fn id_list(value: Option<&Value>) -> Option<Vec<u64>> {
        value
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_u64).collect())
    }

    fn parse_game(item: &Value) -> Option<RawGame> {
        let id = item.get("id")?.as_u64()?;
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(RawGame {
            id,
            name,
            summary: item
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_string),
            rating: item.get("rating").and_then(Value::as_f64),
            genre_ids: Self::id_list(item.get("genres")),
            keyword_ids: Self::id_list(item.get("keywords")),
        })
    }

    fn parse_games(value: &Value) -> Vec<RawGame> {
        Self::array_items(value)
            .iter()
            .filter_map(Self::parse_game)
            .collect()
    }

    fn parse_names(value: &Value) -> HashMap<u64, String> {
        Self::array_items(value)
            .iter()
            .filter_map(|item| {
                let id = item.get("id")?.as_u64()?;
                let name = item.get("name")?.as_str()?;
                Some((id, name.to_string()))
            })
            .collect()
    }

    fn parse_urls(value: &Value) -> Vec<String> {
        Self::array_items(value)
            .iter()
            .filter_map(|item| item.get("url").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

impl MetadataService for IgdbApi {
    fn search(&self, text: &str, limit: u32) -> Result<Vec<RawGame>, String> {
        let parsed = self.post_query("games", &Self::search_query(text, limit))?;
        Ok(Self::parse_games(&parsed))
    }

    fn lookup(&self, vocabulary: Vocabulary, ids: &[u64]) -> Result<HashMap<u64, String>, String> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let parsed = self.post_query(vocabulary.endpoint(), &Self::lookup_query(ids))?;
        debug!("Received {parsed} from IGDB for {}", vocabulary.endpoint());
        Ok(Self::parse_names(&parsed))
    }

    fn websites(&self, game_id: u64, category: u32) -> Result<Vec<String>, String> {
        let parsed = self.post_query("websites", &Self::websites_query(game_id, category))?;
        Ok(Self::parse_urls(&parsed))
    }
}
