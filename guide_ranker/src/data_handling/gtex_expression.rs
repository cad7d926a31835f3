use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::{debug, error, info};

use crate::data_handling::{Dataset, ExpressionTable};
use crate::error::{RankerError, RankerResult};
use crate::helper_functions::read_csv;
use crate::models::ExpressionRow;

pub const ID_COLUMN: &str = "Id";

/// Pre-processed GTEx exon expression, normalized per tissue.
///
/// The CSV has an `Id` column (`<gene id>_<exon number>`) and one numeric
/// column per tissue.
pub struct GtexExonExpression {
    pub path: String,
}

impl Dataset for GtexExonExpression {
    fn load(&self) -> PolarsResult<DataFrame> {
        info!("Reading exon expression data from {}", &self.path);
        let df = match read_csv(&self.path) {
            Ok(df) => df,
            Err(e) => {
                error!("Failed to read expression CSV: {}", e);
                return Err(e);
            }
        };
        debug!("Loaded {} exon rows", df.height());
        Ok(df)
    }
}

pub struct PolarsExpressionTable {
    df: DataFrame,
    tissues: Vec<String>,
}

impl PolarsExpressionTable {
    /// Wraps an expression DataFrame. Every column except `Id` is a tissue.
    pub fn new(df: DataFrame) -> RankerResult<Self> {
        let names = df.get_column_names();
        if !names.iter().any(|c| c.as_str() == ID_COLUMN) {
            return Err(PolarsError::ColumnNotFound(ID_COLUMN.into()).into());
        }
        let tissues = names
            .iter()
            .map(|c| c.to_string())
            .filter(|c| c != ID_COLUMN)
            .collect();
        Ok(Self { df, tissues })
    }

    pub fn from_dataset(dataset: &impl Dataset) -> RankerResult<Self> {
        Self::new(dataset.load()?)
    }

    pub fn tissues(&self) -> &[String] {
        &self.tissues
    }

    /// Fails on the first configured tissue missing from the table.
    pub fn check_tissues(&self, wanted: &[String]) -> RankerResult<()> {
        match wanted.iter().find(|t| !self.tissues.contains(t)) {
            Some(missing) => Err(RankerError::UnknownTissue(missing.clone())),
            None => Ok(()),
        }
    }
}

impl ExpressionTable for PolarsExpressionTable {
    fn rows_for_gene(&self, gene_id: &str) -> RankerResult<Vec<ExpressionRow>> {
        let prefix = format!("{gene_id}_");
        let gene_df = self
            .df
            .clone()
            .lazy()
            .filter(col(ID_COLUMN).str().starts_with(lit(prefix)))
            .collect()?;
        debug!("{} expression rows for {}", gene_df.height(), gene_id);

        let ids = gene_df.column(ID_COLUMN)?.str()?.clone();
        let mut tissue_columns = Vec::with_capacity(self.tissues.len());
        for tissue in &self.tissues {
            let values = gene_df.column(tissue)?.cast(&DataType::Float64)?;
            tissue_columns.push((tissue, values));
        }

        let mut rows = Vec::with_capacity(gene_df.height());
        for i in 0..gene_df.height() {
            let Some(exon_key) = ids.get(i) else {
                continue;
            };
            let mut tissues = BTreeMap::new();
            for (tissue, values) in &tissue_columns {
                if let Some(v) = values.f64()?.get(i) {
                    tissues.insert(tissue.to_string(), v);
                }
            }
            rows.push(ExpressionRow {
                exon_key: exon_key.to_string(),
                tissues,
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::io::Write;

    fn expression_df() -> DataFrame {
        df![
            "Id" => &["ENSG1.2_0", "ENSG1.2_1", "ENSG10.1_0", "ENSG1.2_2"],
            "Brain" => &[1.0, 2.0, 3.0, 4.0],
            "Heart" => &[5.0, 6.0, 7.0, 8.0],
            "Liver" => &[0.5, 0.25, 0.0, 1.5]
        ]
        .unwrap()
    }

    #[test]
    fn rows_are_filtered_by_gene_prefix() {
        let table = PolarsExpressionTable::new(expression_df()).unwrap();
        assert_eq!(table.tissues(), &["Brain", "Heart", "Liver"]);

        let rows = table.rows_for_gene("ENSG1.2").unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.exon_key.as_str()).collect();
        assert_eq!(keys, vec!["ENSG1.2_0", "ENSG1.2_1", "ENSG1.2_2"]);
        assert_eq!(rows[1].tissues.get("Heart"), Some(&6.0));
        assert_eq!(rows[2].tissues.len(), 3);
    }

    #[test]
    fn unknown_gene_has_no_rows() {
        let table = PolarsExpressionTable::new(expression_df()).unwrap();
        assert!(table.rows_for_gene("ENSG999").unwrap().is_empty());
    }

    #[test]
    fn tissue_check_reports_the_missing_column() {
        let table = PolarsExpressionTable::new(expression_df()).unwrap();
        assert!(table.check_tissues(&["Brain".into(), "Heart".into()]).is_ok());
        match table.check_tissues(&["Brain".into(), "Muscle".into()]) {
            Err(RankerError::UnknownTissue(t)) => assert_eq!(t, "Muscle"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn table_without_id_column_is_rejected() {
        let df = df!["Brain" => &[1.0]].unwrap();
        assert!(PolarsExpressionTable::new(df).is_err());
    }

    #[test]
    fn loads_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Id,Brain,Heart").unwrap();
        writeln!(file, "ENSG7.1_0,1.5,2.5").unwrap();
        writeln!(file, "ENSG7.1_1,3.5,").unwrap();

        let dataset = GtexExonExpression {
            path: file.path().to_string_lossy().to_string(),
        };
        let table = PolarsExpressionTable::from_dataset(&dataset).unwrap();
        let rows = table.rows_for_gene("ENSG7.1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tissues.get("Heart"), Some(&2.5));
        assert!(!rows[1].tissues.contains_key("Heart"));
    }
}
