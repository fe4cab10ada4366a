//! Rerank toponym candidates: a population-only initial ranker proposes
//! places, and a classifier trained on held-out rankings reorders them
//! using the distance to the document's context.
//!
//! ```text
//! cargo run --example rerank_demo
//! ```

use linrank::feature::FeatureVectorFactory;
use linrank::rank::{
    evaluate_accuracy, InitialRankerTrainer, Ranker, RerankerConfig, RerankerTrainer, Rescaling,
};
use linrank::train::Method;
use linrank::{Attribute, ClassifierConfig, Result};

#[derive(Debug, Clone, PartialEq)]
struct Place {
    name: &'static str,
    lat: f64,
    lon: f64,
    population: f64,
}

#[derive(Debug, Clone)]
struct Mention {
    name: &'static str,
    /// Centre of the other places named in the document
    context: (f64, f64),
}

const GAZETTEER: &[Place] = &[
    Place { name: "Paris", lat: 48.86, lon: 2.35, population: 2_100_000.0 },
    Place { name: "Paris", lat: 33.66, lon: -95.56, population: 25_000.0 },
    Place { name: "Paris", lat: 36.30, lon: -88.33, population: 10_000.0 },
    Place { name: "London", lat: 51.51, lon: -0.13, population: 8_900_000.0 },
    Place { name: "London", lat: 42.98, lon: -81.25, population: 400_000.0 },
    Place { name: "London", lat: 37.13, lon: -84.08, population: 8_000.0 },
    Place { name: "Springfield", lat: 39.80, lon: -89.64, population: 115_000.0 },
    Place { name: "Springfield", lat: 42.10, lon: -72.59, population: 155_000.0 },
    Place { name: "Springfield", lat: 37.21, lon: -93.29, population: 170_000.0 },
];

/// Ranks same-named places by population alone
struct ByPopulation;

impl Ranker<Mention, Place> for ByPopulation {
    fn evaluate(
        &self,
        mention: &Mention,
        _correct: Option<&Place>,
        _include_correct: bool,
    ) -> Result<Vec<(Place, f64)>> {
        let mut ranked: Vec<(Place, f64)> = GAZETTEER
            .iter()
            .filter(|p| p.name == mention.name)
            .map(|p| (p.clone(), p.population.ln()))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }
}

struct ByPopulationTrainer;

impl InitialRankerTrainer<Mention, Place> for ByPopulationTrainer {
    type Ranker = ByPopulation;

    fn train(&self, _corpus: &[(Mention, Place)]) -> Result<ByPopulation> {
        Ok(ByPopulation)
    }
}

fn featurize(mention: &Mention, place: &Place, score: f64, rank: usize) -> Vec<Attribute> {
    let (lat, lon) = mention.context;
    let distance = ((place.lat - lat).powi(2) + (place.lon - lon).powi(2)).sqrt();
    vec![
        Attribute::new("distance", distance / 10.0),
        Attribute::new("initial-score", score),
        Attribute::new(format!("rank={}", rank), 1.0),
    ]
}

/// Mentions whose correct reading is the place nearest to the context
fn corpus() -> Vec<(Mention, Place)> {
    let contexts = [
        (47.0, 3.0),
        (34.0, -96.0),
        (36.0, -88.0),
        (50.0, 1.0),
        (43.0, -80.0),
        (37.0, -84.0),
        (40.0, -89.0),
        (42.0, -72.0),
        (37.0, -93.0),
        (49.0, 4.0),
        (35.0, -90.0),
        (44.0, -79.0),
    ];
    let mut corpus = Vec::new();
    for name in ["Paris", "London", "Springfield"] {
        for &context in &contexts {
            let nearest = GAZETTEER
                .iter()
                .filter(|p| p.name == name)
                .min_by(|a, b| {
                    let da = (a.lat - context.0).powi(2) + (a.lon - context.1).powi(2);
                    let db = (b.lat - context.0).powi(2) + (b.lon - context.1).powi(2);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(place) = nearest {
                corpus.push((Mention { name, context }, place.clone()));
            }
        }
    }
    corpus
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let corpus = corpus();
    let mut classifier = ClassifierConfig::new(Method::PassiveAggressive);
    classifier.set("aggressiveness", "0.5")?;
    let config = RerankerConfig::default()
        .with_top_n(3)?
        .with_number_of_splits(4)?
        .with_rescaling(Rescaling::Standardize)
        .with_classifier(classifier);

    let mut trainer = RerankerTrainer::new(
        ByPopulationTrainer,
        featurize,
        FeatureVectorFactory::default(),
        config,
    );
    trainer.verbose(true);
    let (reranker, reports) = trainer.train(&corpus)?;
    for report in &reports {
        println!(
            "split {}: {} held out, {} used, {} skipped",
            report.split, report.held_out, report.used, report.skipped
        );
    }

    let initial = evaluate_accuracy(reranker.initial_ranker(), &corpus)?;
    let reranked = evaluate_accuracy(&reranker, &corpus)?;
    println!(
        "initial:  accuracy {:.3}, MRR {:.3}",
        initial.accuracy(),
        initial.mean_reciprocal_rank
    );
    println!(
        "reranked: accuracy {:.3}, MRR {:.3}",
        reranked.accuracy(),
        reranked.mean_reciprocal_rank
    );

    let mention = Mention {
        name: "Paris",
        context: (35.5, -94.0),
    };
    for (place, score) in reranker.evaluate(&mention, None, false)? {
        println!("{:>8.3}  {} ({:.2}, {:.2})", score, place.name, place.lat, place.lon);
    }
    Ok(())
}
