//! Bulk loading of ingredients and tags from CSV or JSON files.
//!
//! The file format follows the extension: `.json` is a JSON array of
//! objects, anything else is read as header-less CSV. Every row is
//! validated before anything is written, so a bad file loads nothing.

use std::path::Path;

use serde::Deserialize;
use tokio::fs;
use tracing::info;

use crate::db::{self, CreateIngredient, CreateTag, DbPool};
use crate::error::FieldErrors;
use crate::validation::{self, MAX_TITLE_LENGTH};
use crate::{Error, Result};

/// Outcome of a load run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub created: usize,
    pub skipped: usize,
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} created, {} skipped", self.created, self.skipped)
    }
}

#[derive(Debug, Deserialize)]
struct IngredientRow {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagRow {
    name: String,
    color: String,
    slug: String,
}

/// Loads reference data into the database.
#[derive(Clone)]
pub struct DataLoader {
    db: DbPool,
}

impl DataLoader {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Load ingredients; existing (name, unit) pairs are skipped.
    pub async fn load_ingredients(&self, path: &Path) -> Result<LoadReport> {
        let rows: Vec<IngredientRow> = read_rows(path).await?;

        let mut inputs = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let mut errors = FieldErrors::new();
            let name =
                validation::required_text(&mut errors, "name", Some(&row.name), MAX_TITLE_LENGTH);
            let unit = validation::required_text(
                &mut errors,
                "measurement_unit",
                Some(&row.measurement_unit),
                MAX_TITLE_LENGTH,
            );
            match (name, unit) {
                (Some(name), Some(unit)) => inputs.push(CreateIngredient {
                    name: name.to_string(),
                    measurement_unit: unit.to_string(),
                }),
                _ => return Err(row_error(index, &errors)),
            }
        }

        let mut report = LoadReport::default();
        for input in &inputs {
            if db::insert_ingredient_if_absent(&self.db, input).await? {
                report.created += 1;
            } else {
                report.skipped += 1;
            }
        }

        info!(path = %path.display(), created = report.created, skipped = report.skipped, "Loaded ingredients");
        Ok(report)
    }

    /// Load tags; existing slugs are skipped.
    ///
    /// A row reusing the name or color of a tag with another slug, in the
    /// database or earlier in the file, fails the whole load.
    pub async fn load_tags(&self, path: &Path) -> Result<LoadReport> {
        let rows: Vec<TagRow> = read_rows(path).await?;

        let mut inputs: Vec<CreateTag> = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let mut errors = FieldErrors::new();
            let name =
                validation::required_text(&mut errors, "name", Some(&row.name), MAX_TITLE_LENGTH);
            let color = validation::tag_color(&mut errors, row.color.trim());
            let slug = validation::slug(&mut errors, row.slug.trim());
            let input = match (name, color, slug) {
                (Some(name), Some(color), Some(slug)) => CreateTag {
                    name: name.to_string(),
                    color,
                    slug,
                },
                _ => return Err(row_error(index, &errors)),
            };

            let earlier = inputs
                .iter()
                .find(|t| t.slug != input.slug && (t.name == input.name || t.color == input.color))
                .cloned();
            let existing = match earlier {
                Some(tag) => Some(tag),
                None => db::find_tag_conflict(&self.db, &input)
                    .await?
                    .map(|t| CreateTag {
                        name: t.name,
                        color: t.color,
                        slug: t.slug,
                    }),
            };
            if let Some(other) = existing {
                if other.name == input.name {
                    errors.add("name", format!("Already used by tag \"{}\".", other.slug));
                }
                if other.color == input.color {
                    errors.add("color", format!("Already used by tag \"{}\".", other.slug));
                }
                return Err(row_error(index, &errors));
            }
            inputs.push(input);
        }

        let mut report = LoadReport::default();
        for input in &inputs {
            if db::insert_tag_if_absent(&self.db, input).await? {
                report.created += 1;
            } else {
                report.skipped += 1;
            }
        }

        info!(path = %path.display(), created = report.created, skipped = report.skipped, "Loaded tags");
        Ok(report)
    }
}

fn row_error(index: usize, errors: &FieldErrors) -> Error {
    Error::BadRequest(format!("Row {}: {}", index + 1, errors))
}

async fn read_rows<T>(path: &Path) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::BadRequest(format!("Cannot read {}: {}", path.display(), e)))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return Ok(serde_json::from_str(&content)?);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{list_ingredients, list_tags, test_pool};
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_ingredients_csv_skips_existing() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "ingredients.csv",
            "flour,g\nmilk,ml\n\"salt, sea\",g\nflour,g\n",
        );
        let loader = DataLoader::new(pool.clone());

        let report = loader.load_ingredients(&path).await.unwrap();
        assert_eq!(report, LoadReport { created: 3, skipped: 1 });

        let again = loader.load_ingredients(&path).await.unwrap();
        assert_eq!(again, LoadReport { created: 0, skipped: 4 });

        let names: Vec<String> = list_ingredients(&pool, None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["flour", "milk", "salt, sea"]);
    }

    #[tokio::test]
    async fn test_load_ingredients_json() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "ingredients.json",
            r#"[{"name": "egg", "measurement_unit": "pcs"}]"#,
        );

        let report = DataLoader::new(pool).load_ingredients(&path).await.unwrap();
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn test_load_tags_json() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "tags.json",
            r##"[
                {"name": "Breakfast", "color": "#e26c2d", "slug": "breakfast"},
                {"name": "Lunch", "color": "#49B64E", "slug": "lunch"}
            ]"##,
        );

        let report = DataLoader::new(pool.clone()).load_tags(&path).await.unwrap();
        assert_eq!(report.to_string(), "2 created, 0 skipped");

        let tags = list_tags(&pool).await.unwrap();
        assert_eq!(tags[0].color, "#E26C2D");
    }

    #[tokio::test]
    async fn test_invalid_tag_row_loads_nothing() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "tags.csv",
            "Breakfast,#E26C2D,breakfast\nDinner,blue,dinner\n",
        );

        let err = DataLoader::new(pool.clone()).load_tags(&path).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Row 2:"), "{}", message);
        assert!(message.contains("color"));
        assert!(list_tags(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_name_or_color_clash_is_row_error() {
        let pool = test_pool().await;
        db::insert_tag_if_absent(
            &pool,
            &CreateTag {
                name: "Breakfast".to_string(),
                color: "#E26C2D".to_string(),
                slug: "breakfast".to_string(),
            },
        )
        .await
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(pool.clone());

        // Existing slug is skipped even though its color differs
        let rerun = write_file(&dir, "rerun.csv", "Breakfast,#000000,breakfast\n");
        assert_eq!(loader.load_tags(&rerun).await.unwrap().skipped, 1);

        let clash = write_file(&dir, "clash.csv", "Lunch,#49B64E,lunch\nBrunch,#e26c2d,brunch\n");
        let message = loader.load_tags(&clash).await.unwrap_err().to_string();
        assert!(message.starts_with("Row 2:"), "{}", message);
        assert!(message.contains("color: Already used by tag \"breakfast\"."), "{}", message);

        let in_file = write_file(&dir, "in_file.csv", "Dinner,#111111,dinner\nDinner,#222222,supper\n");
        let message = loader.load_tags(&in_file).await.unwrap_err().to_string();
        assert!(message.contains("name: Already used by tag \"dinner\"."), "{}", message);

        assert_eq!(list_tags(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_and_malformed_csv() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(pool);

        let missing = dir.path().join("nope.csv");
        assert!(matches!(
            loader.load_ingredients(&missing).await,
            Err(Error::BadRequest(_))
        ));

        let path = write_file(&dir, "short.csv", "flour\n");
        assert!(matches!(
            loader.load_ingredients(&path).await,
            Err(Error::BadRequest(_))
        ));
    }
}
