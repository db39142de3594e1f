#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal client for the immo-map API.
//!
//! The companion process to the server: prompts for an address and a
//! radius, fetches nearby sales, renders the statistics and the nearest
//! records as text, then optionally streams the market analysis into the
//! terminal fragment by fragment.

mod client;

use clap::Parser;
use console::style;
use dialoguer::{Confirm, Input};
use immo_map_server_models::NearbyResponse;

#[derive(Parser)]
#[command(name = "immo_map_cli", about = "Terminal client for the immo-map API")]
struct Cli {
    /// Address to look up; prompted interactively when omitted
    #[arg(long)]
    adresse: Option<String>,
    /// Search radius in meters
    #[arg(long)]
    rayon_m: Option<u32>,
    /// Skip the streamed market analysis
    #[arg(long)]
    no_analyse: bool,
}

/// Number of nearest records printed.
const MAX_ROWS: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let api_url = std::env::var("IMMO_MAP_API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

    let adresse = match cli.adresse {
        Some(a) => a,
        None => Input::new()
            .with_prompt("Adresse (Île-de-France)")
            .interact_text()?,
    };

    let rayon_m = match cli.rayon_m {
        Some(r) => r,
        None => Input::new()
            .with_prompt("Rayon (m)")
            .default(500u32)
            .interact_text()?,
    };

    let http = reqwest::Client::new();

    let response = client::fetch_nearby(&http, &api_url, &adresse, rayon_m).await?;
    render_response(&response);

    if response.biens_proches.is_empty() || cli.no_analyse {
        return Ok(());
    }

    let stream = Confirm::new()
        .with_prompt("Lancer l'analyse du marché ?")
        .default(true)
        .interact()
        .unwrap_or(false);

    if stream {
        println!();
        println!("{}", style("Analyse du marché").bold().underlined());
        if let Err(e) = client::stream_analysis(&http, &api_url, &adresse, rayon_m).await {
            println!("{} {e}", style("Analyse indisponible:").red());
        }
    }

    Ok(())
}

fn render_response(response: &NearbyResponse) {
    let stats = &response.stats;

    println!();
    println!("{}", style("Statistiques").bold().underlined());
    println!("  Biens trouvés     : {}", stats.nb_biens);
    println!("  Prix moyen au m²  : {}", format_opt(stats.prix_moyen, "€"));
    println!("  Surface moyenne   : {}", format_opt(stats.surface_moyenne, "m²"));
    println!("  Distance max      : {}", format_opt(stats.distance_max, "m"));
    println!("  Temps d'exécution : {} s", stats.temps_execution);
    if stats.tronque {
        println!(
            "  {}",
            style("Résultats tronqués: d'autres biens existent dans ce rayon").yellow()
        );
    }

    if response.biens_proches.is_empty() {
        println!();
        println!("{}", style("Aucun bien vendu dans ce rayon.").dim());
        return;
    }

    println!();
    println!("{}", style("Biens les plus proches").bold().underlined());
    println!(
        "  {:>8}  {:<12} {:>10}  {:>8}  {:>6}  {}",
        "distance", "type", "prix €/m²", "surface", "pièces", "date"
    );
    for bien in response.biens_proches.iter().take(MAX_ROWS) {
        println!(
            "  {:>7.0}m  {:<12} {:>10}  {:>7}m²  {:>6}  {}",
            bien.distance_m,
            bien.type_local.to_string(),
            bien.prix_m2.map_or_else(|| "N/A".to_string(), |p| format!("{p:.0}")),
            bien.surface_reelle_bati
                .map_or_else(|| "N/A".to_string(), |s| format!("{s:.0}")),
            bien.nombre_pieces_principales
                .map_or_else(|| "N/A".to_string(), |p| format!("{p:.0}")),
            bien.date_mutation,
        );
    }
    if response.biens_proches.len() > MAX_ROWS {
        println!(
            "  {}",
            style(format!(
                "... et {} autres biens",
                response.biens_proches.len() - MAX_ROWS
            ))
            .dim()
        );
    }

    println!();
    println!("{}", style("Analyse").bold().underlined());
    println!("{}", response.analyse);
}

fn format_opt(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2} {unit}"))
}
