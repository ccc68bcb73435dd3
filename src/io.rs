use crate::model::{SolveRequest, SolveResponse};
use crate::scheduler::{Conflict, SolverConfig};
use anyhow::Context;
use csv::WriterBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P, what: &str) -> anyhow::Result<T> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {what} {}", path.display()))
}

/// Charge une requête de résolution (JSON camelCase).
pub fn load_request_json<P: AsRef<Path>>(path: P) -> anyhow::Result<SolveRequest> {
    load_json(path, "request")
}

pub fn load_response_json<P: AsRef<Path>>(path: P) -> anyhow::Result<SolveResponse> {
    load_json(path, "response")
}

/// Réglages du moteur ; les clés absentes gardent leur valeur par défaut.
pub fn load_config_json<P: AsRef<Path>>(path: P) -> anyhow::Result<SolverConfig> {
    load_json(path, "solver config")
}

/// Écrit du JSON de manière atomique (fichier temporaire puis renommage).
pub fn write_json_atomic<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(value)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).with_context(|| "atomic rename")?;
    Ok(())
}

pub fn write_response_json<P: AsRef<Path>>(path: P, response: &SolveResponse) -> anyhow::Result<()> {
    write_json_atomic(path, response)
}

/// Export CSV de la grille : header `name,1,2,...,N`, une ligne par personne.
pub fn export_schedule_csv<P: AsRef<Path>>(path: P, response: &SolveResponse) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_schedule_csv(file, response)
}

/// Variante sur un `Write` quelconque.
pub fn write_schedule_csv<W: Write>(out: W, response: &SolveResponse) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(out);

    let mut buf = itoa::Buffer::new();
    let mut header = vec!["name".to_string()];
    header.extend((1..=response.days_in_month).map(|d| buf.format(d).to_string()));
    w.write_record(&header)?;

    for (name, row) in &response.schedule {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(name.as_str());
        record.extend(row.iter().map(|code| code.map_or("", |c| c.as_str())));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

/// Rapport CSV des conflits : header `staff,day,code,kind` (jour 1-based).
pub fn export_conflicts_csv<P: AsRef<Path>>(path: P, conflicts: &[Conflict]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_path(path)?;
    w.write_record(["staff", "day", "code", "kind"])?;
    let mut buf = itoa::Buffer::new();
    for c in conflicts {
        w.write_record([
            c.staff.as_str(),
            buf.format(c.day + 1),
            c.code.map_or("", |code| code.as_str()),
            c.kind.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Liste de jours saisie à la main : `"1,2,3"`, `"１，２"`…
///
/// Virgules ASCII ou pleine chasse, chiffres pleine chasse normalisés ; les
/// morceaux non numériques sont ignorés. Résultat trié, sans doublon.
pub fn parse_days(input: &str) -> Vec<u32> {
    let normalized: String = input
        .chars()
        .map(|c| match c {
            '，' => ',',
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect();

    let mut days: Vec<u32> = normalized
        .split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|tok| tok.parse().ok())
        .collect();
    days.sort_unstable();
    days.dedup();
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_days_normalizes_full_width() {
        assert_eq!(parse_days("3,1,2"), vec![1, 2, 3]);
        assert_eq!(parse_days("１，２, 10 ,2"), vec![1, 2, 10]);
        assert_eq!(parse_days("a,5,,-1, 7x"), vec![5]);
        assert!(parse_days("   ").is_empty());
    }
}
