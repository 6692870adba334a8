//! Upstream payload schemas and the records projected from them
//!
//! Raw types mirror the PokeAPI documents closely enough to decode them;
//! unknown fields are ignored. Projections keep only what the catalog
//! serves and replace missing sprite URLs with empty strings.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Numeric id from the last non-empty path segment of a resource URL
///
/// `https://pokeapi.co/api/v2/pokemon/25/` yields `Some(25)`.
pub fn id_from_url(url: &str) -> Option<u32> {
    url.split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .and_then(|segment| segment.parse().ok())
}

/// `{ name, url }` reference to another resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedResource {
    pub fn id(&self) -> Option<u32> {
        id_from_url(&self.url)
    }
}

/// `{ url }` reference without a name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub url: String,
}

// Listing and type membership

#[derive(Debug, Clone, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub count: u32,
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeResponse {
    pub pokemon: Vec<TypeMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeMember {
    #[serde(default)]
    pub slot: u8,
    pub pokemon: NamedResource,
}

// Entity

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSprite {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOtherSprites {
    #[serde(rename = "official-artwork")]
    pub official_artwork: Option<RawSprite>,
    pub dream_world: Option<RawSprite>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSprites {
    pub front_default: Option<String>,
    pub other: Option<RawOtherSprites>,
}

/// `GET /pokemon/{id}` document
#[derive(Debug, Clone, Deserialize)]
pub struct RawPokemon {
    pub id: u32,
    pub name: String,
    pub sprites: Option<RawSprites>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub species: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteUrl {
    pub front_default: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork")]
    pub official_artwork: SpriteUrl,
    pub dream_world: SpriteUrl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    pub front_default: String,
    pub other: OtherSprites,
}

/// Catalog view of a single Pokemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u32,
    pub name: String,
    pub sprites: Sprites,
    pub types: Vec<TypeSlot>,
    pub stats: Vec<StatEntry>,
    pub abilities: Vec<AbilitySlot>,
    pub height: u32,
    pub weight: u32,
    pub base_experience: Option<u32>,
    pub species: NamedResource,
}

impl From<RawPokemon> for EntityRecord {
    fn from(raw: RawPokemon) -> Self {
        let sprites = raw.sprites.unwrap_or_default();
        let other = sprites.other.unwrap_or_default();
        let url = |sprite: Option<RawSprite>| SpriteUrl {
            front_default: sprite.and_then(|s| s.front_default).unwrap_or_default(),
        };

        Self {
            id: raw.id,
            name: raw.name,
            sprites: Sprites {
                front_default: sprites.front_default.unwrap_or_default(),
                other: OtherSprites {
                    official_artwork: url(other.official_artwork),
                    dream_world: url(other.dream_world),
                },
            },
            types: raw.types,
            stats: raw.stats,
            abilities: raw.abilities,
            height: raw.height,
            weight: raw.weight,
            base_experience: raw.base_experience,
            species: raw.species,
        }
    }
}

fn first_non_empty<'a>(candidates: [&'a str; 3]) -> &'a str {
    candidates
        .into_iter()
        .find(|url| !url.is_empty())
        .unwrap_or_default()
}

impl EntityRecord {
    /// Small sprite: default, then official artwork, then dream world
    pub fn thumbnail(&self) -> &str {
        first_non_empty([
            self.sprites.front_default.as_str(),
            self.sprites.other.official_artwork.front_default.as_str(),
            self.sprites.other.dream_world.front_default.as_str(),
        ])
    }

    /// Large image: official artwork, then dream world, then default
    pub fn image(&self) -> &str {
        first_non_empty([
            self.sprites.other.official_artwork.front_default.as_str(),
            self.sprites.other.dream_world.front_default.as_str(),
            self.sprites.front_default.as_str(),
        ])
    }

    /// Type names ordered by slot
    pub fn type_names(&self) -> Vec<&str> {
        let mut slots: Vec<&TypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|t| t.slot);
        slots.into_iter().map(|t| t.kind.name.as_str()).collect()
    }

    pub fn total_stats(&self) -> u32 {
        self.stats.iter().map(|s| s.base_stat).sum()
    }
}

// Species

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: NamedResource,
    #[serde(default)]
    pub version: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genus {
    pub genus: String,
    pub language: NamedResource,
}

/// `GET /pokemon-species/{id}` document
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpecies {
    pub evolution_chain: Option<ResourceLink>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
    #[serde(default)]
    pub genera: Vec<Genus>,
    pub color: Option<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub evolution_chain: Option<ResourceLink>,
    pub flavor_text_entries: Vec<FlavorTextEntry>,
    pub genera: Vec<Genus>,
    pub color: Option<NamedResource>,
}

impl From<RawSpecies> for SpeciesSummary {
    fn from(raw: RawSpecies) -> Self {
        Self {
            evolution_chain: raw.evolution_chain,
            flavor_text_entries: raw.flavor_text_entries,
            genera: raw.genera,
            color: raw.color,
        }
    }
}

impl SpeciesSummary {
    /// First flavor text in the earliest matching language, with the
    /// embedded line and form feeds flattened to spaces
    pub fn description(&self, languages: &[&str]) -> Option<String> {
        languages.iter().find_map(|lang| {
            self.flavor_text_entries
                .iter()
                .find(|e| e.language.name == *lang)
                .map(|e| e.flavor_text.replace(['\n', '\u{c}'], " "))
        })
    }

    /// Genus in the earliest matching language
    pub fn genus(&self, languages: &[&str]) -> Option<&str> {
        languages.iter().find_map(|lang| {
            self.genera
                .iter()
                .find(|g| g.language.name == *lang)
                .map(|g| g.genus.as_str())
        })
    }

    pub fn evolution_chain_id(&self) -> Option<u32> {
        self.evolution_chain
            .as_ref()
            .and_then(|link| id_from_url(&link.url))
    }
}

// Evolution

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionDetail {
    pub min_level: Option<u32>,
    pub trigger: NamedResource,
    pub item: Option<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolves_to: Vec<EvolutionLink>,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
}

/// `GET /evolution-chain/{id}` document, projected to its chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionChain {
    pub chain: EvolutionLink,
}

/// One step of a linear evolution line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionStage {
    pub id: u32,
    pub name: String,
}

impl EvolutionChain {
    /// Follow the first branch from the base form
    ///
    /// Species whose URL carries no numeric id are skipped.
    pub fn line(&self) -> Vec<EvolutionStage> {
        let mut stages = Vec::new();
        let mut current = Some(&self.chain);
        while let Some(link) = current {
            if let Some(id) = link.species.id() {
                stages.push(EvolutionStage {
                    id,
                    name: link.species.name.clone(),
                });
            }
            current = link.evolves_to.first();
        }
        stages
    }
}
