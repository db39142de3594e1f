//! Deterministic prompt template for the market narrative.
//!
//! The rendered prompt depends only on the statistics and the radius; the
//! per-type blocks follow the `BTreeMap` ordering of the statistics so
//! re-rendering the same input yields the same text. The zero-result
//! behavior lives in the instruction block: the model is told to emit a
//! single canned sentence when no sales exist. That is a prompt-level
//! convention, not something enforced in code.

use std::fmt::Write as _;

use immo_map_stats::MarketStats;

/// Sentence the model is instructed to emit when the result set is empty.
pub const NO_SALES_SENTENCE: &str = "Aucun bien vendu en 2024 dans ce rayon";

/// Renders the analysis prompt for the given statistics and radius.
#[must_use]
pub fn render(stats: &MarketStats, rayon_m: u32) -> String {
    let total = stats.total_count();

    let mut repartition = String::new();
    for (type_local, type_stats) in &stats.par_type {
        let _ = writeln!(repartition, "- {type_local} : {} bien(s)", type_stats.nb_biens);
    }

    let mut blocks = String::new();
    for (type_local, type_stats) in &stats.par_type {
        let _ = writeln!(blocks, "{type_local} :");
        let _ = writeln!(blocks, "- Nombre de biens : {}", type_stats.nb_biens);
        let _ = writeln!(blocks, "- Prix moyen au m² : {} €", format_stat(type_stats.prix_m2_moyen));
        let _ = writeln!(blocks, "- Prix max au m² : {} €", format_stat(type_stats.prix_m2_max));
        let _ = writeln!(blocks, "- Prix min au m² : {} €", format_stat(type_stats.prix_m2_min));
        let _ = writeln!(blocks, "- Surface moyenne : {} m²", format_stat(type_stats.surface_moyenne));
        let _ = writeln!(
            blocks,
            "- Nombre de pièces moyen : {}",
            format_stat(type_stats.nombre_pieces_moyen)
        );
    }

    format!(
        "Voici un résumé détaillé des biens vendus dans un rayon de {rayon_m} mètres :\n\n\
         Nombre total de biens : {total}\n\
         Répartition par type :\n{repartition}\n\
         {blocks}\n\
         Analyse factuelle en 4-5 phrases :\n\
         • Prix par type : écarts min/max/moyen et ce qu'ils révèlent\n\
         • Surfaces et pièces : interprétation des moyennes observées\n\
         • Traite chaque type séparément, aucune comparaison entre types\n\
         • Reste sur les données uniquement, aucune supposition externe\n\
         • Si 0 bien : '{NO_SALES_SENTENCE}'"
    )
}

fn format_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v}"))
}

#[cfg(test)]
mod tests {
    use immo_map_stats::TypeStats;
    use immo_map_property_models::PropertyType;

    use super::*;

    #[test]
    fn renders_per_type_blocks() {
        let mut stats = MarketStats::default();
        stats.par_type.insert(
            PropertyType::Appartement,
            TypeStats {
                nb_biens: 3,
                prix_m2_moyen: Some(5000.0),
                prix_m2_min: Some(4000.0),
                prix_m2_max: Some(6000.0),
                surface_moyenne: Some(50.0),
                nombre_pieces_moyen: Some(3.0),
            },
        );

        let prompt = render(&stats, 500);

        assert!(prompt.contains("rayon de 500 mètres"));
        assert!(prompt.contains("Nombre total de biens : 3"));
        assert!(prompt.contains("- Appartement : 3 bien(s)"));
        assert!(prompt.contains("- Prix moyen au m² : 5000 €"));
        assert!(prompt.contains("- Prix min au m² : 4000 €"));
    }

    #[test]
    fn absent_statistics_render_as_na() {
        let mut stats = MarketStats::default();
        stats.par_type.insert(
            PropertyType::Maison,
            TypeStats {
                nb_biens: 1,
                ..TypeStats::default()
            },
        );

        let prompt = render(&stats, 300);
        assert!(prompt.contains("- Prix moyen au m² : N/A €"));
    }

    #[test]
    fn empty_stats_keep_the_no_sales_instruction() {
        let prompt = render(&MarketStats::default(), 200);
        assert!(prompt.contains("Nombre total de biens : 0"));
        assert!(prompt.contains(NO_SALES_SENTENCE));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut stats = MarketStats::default();
        stats.par_type.insert(PropertyType::Maison, TypeStats::default());
        stats.par_type.insert(PropertyType::Appartement, TypeStats::default());

        assert_eq!(render(&stats, 800), render(&stats, 800));
    }
}
