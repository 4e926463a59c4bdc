use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use citycast_core::{AppError, Config};
use citycast_services::{AddOutcome, Dashboard, DashboardView, Panel, SqliteStorage};
use citycast_weather::{icon_url, City, CitySearchResult};
use clap::Parser;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    citycast_core::init()?;

    let cli = Cli::parse();
    let (config, _) = Config::load_validated(cli.config.as_deref())?;

    let storage = SqliteStorage::open(config.storage.database_path())
        .context("Failed to open saved cities")?;
    let dashboard = Arc::new(Dashboard::from_config(&config, Box::new(storage))?);

    tracing::debug!("CityCast started with {} saved cities", dashboard.cities().len());

    match cli.command {
        Commands::List => print_cities(&dashboard.cities(), dashboard.selected_city().as_ref(), cli.json)?,
        Commands::Add { name } => add(&dashboard, &name, cli.json).await?,
        Commands::Remove { city } => {
            let target = resolve(&dashboard, &city)?;
            dashboard.remove_city(&target.id)?;
            println!("Removed {}", target.name);
        }
        Commands::Move { from, to } => {
            let (cities, selected) = move_city(&dashboard, from, to)?;
            print_cities(&cities, selected.as_ref(), cli.json)?;
        }
        Commands::Select { city } => {
            select(&dashboard, &city)?;
            print_view(&dashboard.view().await, cli.json)?;
        }
        Commands::Show { city } => {
            if let Some(city) = city {
                select(&dashboard, &city)?;
            }
            print_view(&dashboard.view().await, cli.json)?;
        }
        Commands::Search { query } => print_suggestions(&dashboard.search(&query).await, cli.json)?,
        Commands::Watch { city, interval } => {
            if let Some(city) = city {
                select(&dashboard, &city)?;
            }
            watch(&dashboard, Duration::from_secs(interval.max(1)), cli.json).await?;
        }
    }

    Ok(())
}

fn resolve(dashboard: &Dashboard, name_or_id: &str) -> Result<City> {
    dashboard
        .find_city(name_or_id)
        .or_else(|| dashboard.cities().into_iter().find(|c| c.id == name_or_id))
        .with_context(|| format!("\"{}\" is not a saved city", name_or_id))
}

/// Reorder by 1-based positions and return the list to print
fn move_city(dashboard: &Dashboard, from: u16, to: u16) -> Result<(Vec<City>, Option<City>)> {
    dashboard.reorder(usize::from(from) - 1, usize::from(to) - 1)?;
    Ok((dashboard.cities(), dashboard.selected_city()))
}

fn select(dashboard: &Dashboard, name_or_id: &str) -> Result<()> {
    let city = resolve(dashboard, name_or_id)?;
    dashboard.select(Some(&city.id));
    Ok(())
}

async fn add(dashboard: &Dashboard, name: &str, json: bool) -> Result<()> {
    match dashboard.add_city(name).await {
        Ok(AddOutcome::Added(city)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&city)?);
            } else {
                println!("Added {} ({:.4}, {:.4})", city.name, city.lat, city.lon);
            }
        }
        Ok(AddOutcome::Duplicate(city)) => println!("{} is already saved", city.name),
        Ok(AddOutcome::LimitReached { max }) => {
            println!("You can save at most {} cities. Remove one first.", max)
        }
        // Lookup failures are reported like validation errors; the list is unchanged
        Err(e) if !matches!(e, AppError::Storage(_)) => println!("{}", e.user_message()),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn watch(dashboard: &Arc<Dashboard>, interval: Duration, json: bool) -> Result<()> {
    let handle = dashboard.spawn_revalidation(interval);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => print_view(&dashboard.view().await, json)?,
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    handle.stop().await;
    Ok(())
}

fn print_cities(cities: &[City], selected: Option<&City>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(cities)?);
        return Ok(());
    }

    if cities.is_empty() {
        println!("No saved cities. Add one with `citycast add <name>`.");
    }
    for line in city_lines(cities, selected) {
        println!("{}", line);
    }
    Ok(())
}

fn city_lines(cities: &[City], selected: Option<&City>) -> Vec<String> {
    cities
        .iter()
        .enumerate()
        .map(|(position, city)| {
            let marker = if selected.is_some_and(|s| s.id == city.id) { "*" } else { " " };
            format!(
                "{} {:>2}. {:<24} {:>8.4} {:>9.4}",
                marker,
                position + 1,
                city.name,
                city.lat,
                city.lon
            )
        })
        .collect()
}

fn print_suggestions(results: &[CitySearchResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matches");
    }
    for result in results {
        println!("{:<24} {}", result.name, result.location_label());
    }
    Ok(())
}

fn print_view(view: &DashboardView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    print_cities(&view.cities, view.selected.as_ref(), false)?;

    let Some(city) = &view.selected else {
        return Ok(());
    };
    println!();
    println!("== {} ==", city.name);

    match &view.current {
        Panel::Ready(w) => {
            println!(
                "{:.1}° (feels like {:.1}°)  {} ({})  humidity {}%  wind {:.1} m/s",
                w.temperature,
                w.feels_like,
                w.condition,
                w.category.description(),
                w.humidity,
                w.wind_speed
            );
            println!("icon: {}", icon_url(&w.condition_icon));
        }
        Panel::Failed(message) => println!("Current weather: {}", message),
        Panel::Empty => {}
    }

    match &view.forecast {
        Panel::Ready(f) => {
            println!();
            for day in &f.forecast {
                println!(
                    "{}  {:>5.1}° / {:>5.1}°  {}",
                    day.date, day.min_temp, day.max_temp, day.condition
                );
            }
        }
        Panel::Failed(message) => println!("Forecast: {}", message),
        Panel::Empty => {}
    }

    if let Some(map) = &view.map {
        println!();
        println!(
            "map: center {:.4},{:.4} zoom {}  {}",
            map.center[0], map.center[1], map.zoom, map.tile_url_template
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use citycast_services::MemoryStorage;

    fn dashboard() -> Dashboard {
        let storage = MemoryStorage::with_raw(
            r#"[{"id":"a","name":"Oslo","lat":0,"lon":0,"order":0},
                {"id":"b","name":"Rome","lat":0,"lon":0,"order":1},
                {"id":"c","name":"Lima","lat":0,"lon":0,"order":2}]"#,
        );
        Dashboard::from_config(&Config::default(), Box::new(storage)).unwrap()
    }

    #[test]
    fn test_move_listing_marks_selected_city() {
        let dashboard = dashboard();

        let (cities, selected) = move_city(&dashboard, 1, 3).unwrap();
        let lines = city_lines(&cities, selected.as_ref());

        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("*  3. Oslo"), "got {:?}", lines[2]);
        assert_eq!(lines.iter().filter(|l| l.starts_with('*')).count(), 1);
    }

    #[test]
    fn test_move_rejects_out_of_range_position() {
        let dashboard = dashboard();
        assert!(move_city(&dashboard, 1, 9).is_err());
        assert_eq!(dashboard.cities()[0].name, "Oslo");
    }
}
