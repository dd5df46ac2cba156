//! Network free analysis. Everything except the caption pick is deterministic; the caption is
//! drawn from a pool with the random source handed in by the caller.

use rand::{seq::SliceRandom, Rng};

use crate::{daemon::storage::entities::CategoryMinutes, utils::time::round_one_decimal};

use super::{categorizer::ProductivityAnalysis, AnalysisInput, AnalysisResult, AnalysisSource};

pub const SUMMARY_LONG_WORK: &str = "long work day, rest advised";
pub const SUMMARY_LOTS_OF_GAMES: &str = "lots of game time, enjoying life";
pub const SUMMARY_BALANCED: &str = "well-balanced day";
pub const SUMMARY_ORDINARY: &str = "ordinary day";

pub fn analyze<R: Rng + ?Sized>(input: &AnalysisInput, rng: &mut R) -> AnalysisResult {
    let pool = caption_pool(&input.minutes, input.avg_activity_score);
    let caption = pool.choose(rng).cloned().unwrap_or_default();

    AnalysisResult {
        mood_score: round_one_decimal(mood_score(&input.minutes)),
        stress_score: round_one_decimal(stress_score(&input.minutes, input.avg_activity_score)),
        summary: summary_text(&input.minutes, &input.productivity).to_string(),
        caption,
        source: AnalysisSource::Local,
    }
}

/// Leisure lifts the mood.
fn mood_score(minutes: &CategoryMinutes) -> f64 {
    let total = minutes.total();
    if total == 0 {
        return 5.;
    }
    let leisure = (minutes.game + minutes.entertainment) as f64 / total as f64;
    (5. + leisure * 5.).min(10.)
}

/// Long work and busy hands raise stress.
fn stress_score(minutes: &CategoryMinutes, activity: f64) -> f64 {
    let total = minutes.total();
    if total == 0 {
        return 3.;
    }
    let work = minutes.work as f64 / total as f64;
    (3. + work * 4. + activity / 25.).min(10.)
}

fn summary_text(minutes: &CategoryMinutes, productivity: &ProductivityAnalysis) -> &'static str {
    if minutes.work > 360 {
        SUMMARY_LONG_WORK
    } else if minutes.game > 180 {
        SUMMARY_LOTS_OF_GAMES
    } else if productivity.balance_score > 70. {
        SUMMARY_BALANCED
    } else {
        SUMMARY_ORDINARY
    }
}

/// Captions that fit the day. The first matching rule decides the pool.
pub fn caption_pool(minutes: &CategoryMinutes, activity: f64) -> Vec<String> {
    if minutes.total() == 0 {
        return vec!["Barely touched the computer today 📱\nA rare offline day".into()];
    }

    let work_hours = minutes.work / 60;

    if minutes.work > 480 {
        vec![
            "Grind level: MAX 💪\nProductivity maxed out today".into(),
            "Another day packed with work\nStill, busy feels good ✨".into(),
            format!("Focus mode: ON\nToday's record: {work_hours}h+"),
        ]
    } else if minutes.game > 180 {
        vec![
            "Today's source of joy 🎮\nEveryone deserves a day off".into(),
            "Work is for a better life\nand games are part of life ✌️".into(),
            "Fully recharged 🔋\nBack at it tomorrow".into(),
        ]
    } else if minutes.work > 240 && minutes.game > 60 {
        vec![
            "The fine art of working and slacking ⚖️\nPretty happy with today".into(),
            "Work hard, play happy\nJust another grown-up day".into(),
            "A productive day ✨\nWork and rest in balance".into(),
        ]
    } else if minutes.entertainment > 120 {
        vec![
            "Some time to unwind today 🎬\nLife needs its little rituals".into(),
            "Stole half a day of leisure ☕\nEnjoying the moment".into(),
        ]
    } else {
        let stars = ((activity / 20.).max(0.) as usize).min(5);
        vec![
            "An ordinary but lovely day ☀️".into(),
            "Just another day in progress...\nEverything is as it should be".into(),
            format!("Energy today: {}", "⭐".repeat(stars)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        analysis::{categorizer::analyze_productivity, AnalysisInput, AnalysisSource},
        daemon::storage::entities::CategoryMinutes,
    };

    use super::*;

    fn input(minutes: CategoryMinutes, activity: f64) -> AnalysisInput {
        AnalysisInput {
            minutes,
            avg_activity_score: activity,
            productivity: analyze_productivity(&minutes),
        }
    }

    #[test]
    fn empty_day_uses_neutral_scores() {
        let result = analyze(
            &input(CategoryMinutes::default(), 40.),
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(result.mood_score, 5.);
        assert_eq!(result.stress_score, 3.);
        assert_eq!(result.source, AnalysisSource::Local);
        assert!(result.caption.contains("offline day"));
    }

    #[test]
    fn full_work_day_scores() {
        let minutes = CategoryMinutes {
            work: 480,
            ..Default::default()
        };
        let result = analyze(&input(minutes, 0.), &mut StdRng::seed_from_u64(1));
        assert_eq!(result.mood_score, 5.);
        assert_eq!(result.stress_score, 7.);
        assert_eq!(result.summary, SUMMARY_LONG_WORK);
    }

    #[test]
    fn scores_are_capped_and_rounded() {
        let minutes = CategoryMinutes {
            work: 200,
            game: 100,
            ..Default::default()
        };
        let result = analyze(&input(minutes, 200.), &mut StdRng::seed_from_u64(1));
        // 5 + 5 * 100 / 300
        assert_eq!(result.mood_score, 6.7);
        assert_eq!(result.stress_score, 10.);
    }

    #[test]
    fn summary_rules_apply_in_order() {
        let games = CategoryMinutes {
            game: 200,
            ..Default::default()
        };
        assert_eq!(
            analyze(&input(games, 0.), &mut StdRng::seed_from_u64(1)).summary,
            SUMMARY_LOTS_OF_GAMES
        );

        let balanced = CategoryMinutes {
            work: 180,
            game: 90,
            other: 30,
            ..Default::default()
        };
        assert_eq!(
            analyze(&input(balanced, 0.), &mut StdRng::seed_from_u64(1)).summary,
            SUMMARY_BALANCED
        );

        let browsing = CategoryMinutes {
            browse: 100,
            ..Default::default()
        };
        assert_eq!(
            analyze(&input(browsing, 0.), &mut StdRng::seed_from_u64(1)).summary,
            SUMMARY_ORDINARY
        );
    }

    #[test]
    fn caption_pools_follow_thresholds() {
        let long_work = CategoryMinutes {
            work: 540,
            ..Default::default()
        };
        assert!(caption_pool(&long_work, 0.)
            .contains(&"Focus mode: ON\nToday's record: 9h+".to_string()));

        let mixed = CategoryMinutes {
            work: 300,
            game: 90,
            ..Default::default()
        };
        assert_eq!(caption_pool(&mixed, 0.).len(), 3);
        assert!(caption_pool(&mixed, 0.)[0].contains("⚖️"));

        let movies = CategoryMinutes {
            entertainment: 150,
            ..Default::default()
        };
        assert_eq!(caption_pool(&movies, 0.).len(), 2);

        let quiet = CategoryMinutes {
            other: 30,
            ..Default::default()
        };
        assert!(caption_pool(&quiet, 130.).contains(&format!("Energy today: {}", "⭐".repeat(5))));
    }

    #[test]
    fn same_seed_picks_same_caption() {
        let minutes = CategoryMinutes {
            game: 240,
            ..Default::default()
        };
        let first = analyze(&input(minutes, 10.), &mut StdRng::seed_from_u64(42));
        let second = analyze(&input(minutes, 10.), &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
        assert!(caption_pool(&minutes, 10.).contains(&first.caption));
    }
}
