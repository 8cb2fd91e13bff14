use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::error::{BookingError, BookingResult};
use crate::models::{Movie, NewCinema, NewHall, NewMovie, NewScreening, NewUser, Review, Screening};
use crate::store::BookingStore;

#[derive(Debug, Serialize)]
pub struct ScreeningDay {
    pub date: NaiveDate,
    pub screenings: Vec<Screening>,
}

#[derive(Debug, Serialize)]
pub struct MovieDetail {
    pub movie: Movie,
    pub reviews: Vec<Review>,
    pub screenings_by_date: Vec<ScreeningDay>,
}

/// Groups screenings (already in start order) by calendar date.
pub fn group_by_date(screenings: Vec<Screening>) -> Vec<ScreeningDay> {
    let mut days: Vec<ScreeningDay> = Vec::new();
    for screening in screenings {
        let date = screening.start_time.date();
        match days.last_mut() {
            Some(day) if day.date == date => day.screenings.push(screening),
            _ => days.push(ScreeningDay { date, screenings: vec![screening] }),
        }
    }
    days
}

pub async fn movie_detail(
    store: &dyn BookingStore,
    movie_id: i64,
    now: NaiveDateTime,
) -> BookingResult<MovieDetail> {
    let movie = store
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie", movie_id))?;
    let reviews = store.movie_reviews(movie_id).await?;
    let upcoming = store.upcoming_screenings(movie_id, now).await?;

    Ok(MovieDetail { movie, reviews, screenings_by_date: group_by_date(upcoming) })
}

/* ---------- demo catalog ---------- */

/// Ticket price by start hour: 50, 60, 70 or 80.
pub fn screening_price(hour: u32) -> Decimal {
    Decimal::from(50 + (hour % 4) * 10)
}

const HALL_ROWS: i32 = 10;
const HALL_COLS: i32 = 10;
const SCHEDULE_DAYS: i64 = 3;
const FIRST_SHOW_HOUR: u32 = 10;
const LAST_SHOW_HOUR: u32 = 20;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub cinemas: usize,
    pub halls: Vec<i64>,
    pub movies: usize,
    pub screenings: usize,
}

fn demo_movies() -> Vec<NewMovie> {
    let movie = |title: &str, director: &str, genre: &str, duration_minutes: i32, description: &str| NewMovie {
        title: title.to_string(),
        director: Some(director.to_string()),
        genre: Some(genre.to_string()),
        duration_minutes,
        description: Some(description.to_string()),
        ..NewMovie::default()
    };
    vec![
        movie("The Wandering Earth III", "Frant Gwo", "Sci-Fi", 170,
              "Humanity steers the planet out of a dying solar system."),
        movie("Zootopia 2", "Byron Howard", "Animation", 125,
              "Judy and Nick return for a new case in the city of animals."),
        movie("Farewell My Concubine", "Chen Kaige", "Drama", 171,
              "Two Peking opera performers across half a century."),
        movie("Interstellar II", "Christopher Nolan", "Sci-Fi", 185,
              "The search for humanity's future continues beyond the wormhole."),
    ]
}

/// Loads cinemas, halls with their seat grids, movies, a three-day schedule
/// and a demo account (`demo` / `demo123`).
pub async fn seed_demo_catalog(
    store: &dyn BookingStore,
    today: NaiveDate,
    bcrypt_cost: u32,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    if store.find_user_by_login("demo").await?.is_none() {
        let demo = NewUser::with_password("demo", "demo@example.com", "demo123", bcrypt_cost)?;
        store.insert_user(demo).await?;
    }

    let cinemas = [
        ("Wanda Cinema", "93 Jianguo Rd, Chaoyang"),
        ("Dadi Cinema", "1 Zhongguancun St, Haidian"),
        ("Stellar Cinema", "138 Wangfujing St, Dongcheng"),
    ];
    let mut halls = Vec::new();
    for (name, address) in cinemas {
        let cinema = store
            .insert_cinema(NewCinema { name: name.to_string(), address: address.to_string(), phone: None })
            .await?;
        summary.cinemas += 1;

        for n in 1..=3 {
            let hall = store
                .insert_hall(NewHall {
                    cinema_id: cinema.id,
                    name: format!("Hall {}", n),
                    rows: HALL_ROWS,
                    cols: HALL_COLS,
                })
                .await?;
            halls.push(hall);
        }
    }
    summary.halls = halls.iter().map(|h| h.id).collect();

    let mut movies = Vec::new();
    for new_movie in demo_movies() {
        movies.push(store.insert_movie(new_movie).await?);
    }
    summary.movies = movies.len();

    for movie in &movies {
        for hall in &halls {
            for day in 0..SCHEDULE_DAYS {
                for hour in (FIRST_SHOW_HOUR..=LAST_SHOW_HOUR).step_by(2) {
                    let Some(start_time) = (today + Duration::days(day)).and_hms_opt(hour, 0, 0) else {
                        continue;
                    };
                    store
                        .insert_screening(NewScreening {
                            movie_id: movie.id,
                            hall_id: hall.id,
                            start_time,
                            end_time: start_time + Duration::minutes(i64::from(movie.duration_minutes)),
                            price: screening_price(start_time.hour()),
                        })
                        .await?;
                    summary.screenings += 1;
                }
            }
        }
    }

    info!(
        "Demo catalog loaded: {} cinemas, {} halls, {} movies, {} screenings",
        summary.cinemas,
        summary.halls.len(),
        summary.movies,
        summary.screenings
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScreeningStatus;

    fn screening_at(id: i64, day: u32, hour: u32) -> Screening {
        let start = NaiveDate::from_ymd_opt(2025, 5, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap();
        Screening {
            id,
            movie_id: 1,
            hall_id: 1,
            start_time: start,
            end_time: start + Duration::hours(2),
            price: Decimal::from(50),
            remaining_seats: 100,
            status: ScreeningStatus::Upcoming,
        }
    }

    #[test]
    fn prices_follow_start_hour() {
        assert_eq!(screening_price(10), Decimal::from(70));
        assert_eq!(screening_price(12), Decimal::from(50));
        assert_eq!(screening_price(14), Decimal::from(70));
        assert_eq!(screening_price(21), Decimal::from(60));
    }

    #[tokio::test]
    async fn demo_catalog_shape() {
        let store = crate::store::MemoryStore::new();
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let summary = seed_demo_catalog(&store, today, 4).await.unwrap();

        assert_eq!(summary.cinemas, 3);
        assert_eq!(summary.halls.len(), 9);
        assert_eq!(summary.movies, 4);
        assert_eq!(summary.screenings, 4 * 9 * 3 * 6);

        let seats = store.hall_seats(summary.halls[0]).await.unwrap();
        assert_eq!(seats.len(), 100);
        assert_eq!(seats.first().map(|s| s.label()).as_deref(), Some("A1"));
        assert_eq!(seats.last().map(|s| s.label()).as_deref(), Some("J10"));

        let demo = store.find_user_by_login("demo").await.unwrap().unwrap();
        assert!(demo.verify_password("demo123"));

        // a second run keeps the single demo account
        seed_demo_catalog(&store, today, 4).await.unwrap();
        assert!(store.find_user_by_login("demo@example.com").await.unwrap().is_some());
    }

    #[test]
    fn groups_consecutive_days() {
        let days = group_by_date(vec![
            screening_at(1, 1, 10),
            screening_at(2, 1, 14),
            screening_at(3, 2, 10),
        ]);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].screenings.iter().map(|s| s.id).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
    }
}
