use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fooder::algorithms::pruning::{prune, PruneThresholds};
use fooder::algorithms::{distance, RecommendationEngine};
use fooder::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroUsize;

fn synthetic_community(users: u64, recipes: u64, per_user: usize) -> CommunityTable {
    let mut rng = StdRng::seed_from_u64(17);
    let mut table = CommunityTable::new();

    for user_id in 0..users {
        let mut rated = 0;
        while rated < per_user {
            let recipe_id = rng.gen_range(0..recipes);
            if table.rating(user_id, recipe_id).is_some() {
                continue;
            }
            let rating = if rng.gen_bool(0.7) { Rating::Like } else { Rating::Dislike };
            table
                .insert(Interaction::new(user_id, recipe_id, rating))
                .unwrap();
            rated += 1;
        }
    }

    table
}

fn active_profile(recipes: u64, rated: u64) -> ActiveUserProfile {
    ActiveUserProfile::new(DishType::Main).with_ratings(
        (0..rated).map(|i| ((i * 7) % recipes, if i % 3 == 0 { Rating::Dislike } else { Rating::Like })),
    )
}

fn benchmark_distance(c: &mut Criterion) {
    let community = synthetic_community(5_000, 2_000, 20);
    let mut group = c.benchmark_group("distance");

    for rated in [5u64, 20, 80] {
        let profile = active_profile(2_000, rated);
        group.bench_with_input(BenchmarkId::from_parameter(rated), &profile, |b, profile| {
            b.iter(|| black_box(distance(profile.ratings(), &community).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let community = synthetic_community(5_000, 2_000, 20);
    let engine = RecommendationEngine::new(&community);
    let profile = active_profile(2_000, 20);

    for k in [3usize, 30] {
        let k = NonZeroUsize::new(k).unwrap();
        c.bench_function(&format!("recommend_k{}", k), |b| {
            b.iter(|| black_box(engine.recommend(&profile, k).unwrap()));
        });
    }
}

fn benchmark_pruning(c: &mut Criterion) {
    let community = synthetic_community(2_000, 1_000, 10);
    let thresholds = PruneThresholds {
        min_ratings_per_user: 8,
        min_ratings_per_recipe: 15,
    };

    c.bench_function("prune", |b| {
        b.iter(|| {
            let mut table = community.clone();
            black_box(prune(&mut table, thresholds))
        });
    });
}

criterion_group!(benches, benchmark_distance, benchmark_recommend, benchmark_pruning);
criterion_main!(benches);
