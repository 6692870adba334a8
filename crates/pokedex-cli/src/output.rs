//! Result rendering for the terminal

use crate::cli::OutputFormat;
use anyhow::Result;
use pokedex_catalog::{
    CatalogPage, EntityRecord, EvolutionStage, Generation, PokemonType, SpeciesSummary,
};
use serde::Serialize;
use std::io::{self, Write};

pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, value)?;
        writeln!(stdout)?;
        Ok(())
    }

    pub fn page(&self, page: &CatalogPage) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(page),
            OutputFormat::Text => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{} matching", page.total)?;
                for record in &page.items {
                    writeln!(stdout, "{}", summary_line(record))?;
                }
                Ok(())
            }
        }
    }

    pub fn pokemon(&self, record: &EntityRecord) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(record),
            OutputFormat::Text => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", summary_line(record))?;
                writeln!(
                    stdout,
                    "height {} dm, weight {} hg, base experience {}",
                    record.height,
                    record.weight,
                    record
                        .base_experience
                        .map_or_else(|| "-".to_string(), |xp| xp.to_string())
                )?;
                for stat in &record.stats {
                    writeln!(stdout, "  {:<16} {:>3}", stat.stat.name, stat.base_stat)?;
                }
                writeln!(stdout, "  {:<16} {:>3}", "total", record.total_stats())?;
                for ability in &record.abilities {
                    let hidden = if ability.is_hidden { " (hidden)" } else { "" };
                    writeln!(stdout, "  ability: {}{hidden}", ability.ability.name)?;
                }
                if !record.image().is_empty() {
                    writeln!(stdout, "  image: {}", record.image())?;
                }
                Ok(())
            }
        }
    }

    pub fn species(&self, species: &SpeciesSummary, languages: &[&str]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(species),
            OutputFormat::Text => {
                let mut stdout = io::stdout().lock();
                if let Some(genus) = species.genus(languages) {
                    writeln!(stdout, "{genus}")?;
                }
                if let Some(color) = &species.color {
                    writeln!(stdout, "color: {}", color.name)?;
                }
                if let Some(description) = species.description(languages) {
                    writeln!(stdout, "{description}")?;
                }
                if let Some(chain) = species.evolution_chain_id() {
                    writeln!(stdout, "evolution chain: {chain}")?;
                }
                Ok(())
            }
        }
    }

    pub fn evolution_line(&self, stages: &[EvolutionStage]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(stages),
            OutputFormat::Text => {
                let line: Vec<String> = stages
                    .iter()
                    .map(|stage| format!("#{} {}", stage.id, stage.name))
                    .collect();
                writeln!(io::stdout().lock(), "{}", line.join(" -> "))?;
                Ok(())
            }
        }
    }

    pub fn generations(&self, generations: &[Generation]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(generations),
            OutputFormat::Text => {
                let mut stdout = io::stdout().lock();
                for generation in generations {
                    writeln!(
                        stdout,
                        "{:<6} {:<7} #{}-#{}",
                        generation.name,
                        generation.region,
                        generation.start,
                        generation.end()
                    )?;
                }
                Ok(())
            }
        }
    }

    pub fn types(&self, types: &[PokemonType]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(types),
            OutputFormat::Text => {
                let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
                writeln!(io::stdout().lock(), "{}", names.join(" "))?;
                Ok(())
            }
        }
    }

    pub fn ids(&self, ids: &[u32]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.json(ids),
            OutputFormat::Text => {
                let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
                writeln!(io::stdout().lock(), "{}", ids.join(" "))?;
                Ok(())
            }
        }
    }
}

fn summary_line(record: &EntityRecord) -> String {
    format!(
        "#{:04} {:<16} {}",
        record.id,
        record.name,
        record.type_names().join("/")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokedex_catalog::schema::{NamedResource, Sprites, TypeSlot};

    #[test]
    fn test_summary_line() {
        let record = EntityRecord {
            id: 6,
            name: "charizard".to_string(),
            sprites: Sprites::default(),
            types: vec![
                TypeSlot {
                    slot: 2,
                    kind: NamedResource {
                        name: "flying".to_string(),
                        url: String::new(),
                    },
                },
                TypeSlot {
                    slot: 1,
                    kind: NamedResource {
                        name: "fire".to_string(),
                        url: String::new(),
                    },
                },
            ],
            stats: vec![],
            abilities: vec![],
            height: 17,
            weight: 905,
            base_experience: Some(267),
            species: NamedResource::default(),
        };
        assert_eq!(summary_line(&record), "#0006 charizard        fire/flying");
    }
}
