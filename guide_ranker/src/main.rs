use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guide_ranker::data_handling::ensembl::EnsemblSequenceProvider;
use guide_ranker::data_handling::gtex_expression::{GtexExonExpression, PolarsExpressionTable};
use guide_ranker::helper_functions::project_root;
use guide_ranker::{ExonRanker, RunConfig};

fn main() -> anyhow::Result<()> {
    // Setup logging and project configuration
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting the guide ranker");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| project_root().join("ranker_config.json"));
    let run = RunConfig::from_path(&config_path)
        .with_context(|| format!("loading run configuration {}", config_path.display()))?;

    // Load pre-processed GTEx data
    let expression = PolarsExpressionTable::from_dataset(&GtexExonExpression {
        path: run.expression_path.clone(),
    })
    .context("loading exon expression table")?;
    expression
        .check_tissues(&run.ranker.tissues)
        .context("checking configured tissues")?;

    let sequences = EnsemblSequenceProvider::new(&run.ensembl_base_url)?;
    let mut ranker = ExonRanker::new(run.ranker.clone(), sequences, expression)?;

    // Iterate over genes, finding guides for each
    let quantity_per_gene = run.quantity_per_gene();
    for gene in &run.genes {
        ranker
            .rank(&gene.ensembl_gene, &gene.name, quantity_per_gene)
            .with_context(|| format!("ranking guides for {}", gene.name))?;
    }

    let guides_by_exon = ranker.assemble_by_exon().context("assembling guides by exon")?;
    let writer = BufWriter::new(
        File::create(&run.output_path).with_context(|| format!("creating {}", run.output_path))?,
    );
    serde_json::to_writer_pretty(writer, &guides_by_exon)?;
    info!("Guides by exon saved to {}", run.output_path);

    if let Some(csv_path) = &run.guides_csv_path {
        ranker.write_guides_csv(Path::new(csv_path))?;
    }

    info!(
        "Done: {} guides, {} selected, across {} genes",
        ranker.guides().len(),
        ranker.count_selected_guides(),
        run.genes.len()
    );
    Ok(())
}
