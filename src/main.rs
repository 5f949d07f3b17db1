use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use agrisense::api::AppState;
use agrisense::{
    AgriConfig, AgriError, Coordinate, CropAdvice, FloodAssessment, IrrigationPlan,
    IrrigationStatus, LocationInput, LocationParser, RequestTracker, Tracked, telemetry, web,
};

const USAGE: &str = "\
Usage:
  agrisense <location>             crop advice for a place name or `lat,lon`
  agrisense irrigation <lat,lon>   irrigation advice from the last week of rainfall
  agrisense flood <lat,lon>        river discharge flood check
  agrisense interactive            read locations from stdin, newest query wins
  agrisense serve [--port N]       run the JSON HTTP API";

#[derive(Debug, PartialEq)]
enum Command {
    Advise(String),
    Irrigation(String),
    Flood(String),
    Interactive,
    Serve { port: Option<u16> },
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let Some(first) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = args[1..].join(" ");

        Ok(match first.as_str() {
            "-h" | "--help" | "help" => Command::Help,
            "irrigation" => Command::Irrigation(rest),
            "flood" => Command::Flood(rest),
            "interactive" => Command::Interactive,
            "serve" => {
                let port = match args.get(1).map(String::as_str) {
                    None => None,
                    Some("--port") => {
                        let value = args.get(2).context("--port needs a value")?;
                        Some(value.parse().with_context(|| format!("Invalid port: {value}"))?)
                    }
                    Some(other) => bail!("Unknown serve option: {other}"),
                };
                Command::Serve { port }
            }
            _ => Command::Advise(args.join(" ")),
        })
    }
}

fn parse_coordinate(text: &str) -> Result<Coordinate> {
    match LocationParser::parse(text)? {
        LocationInput::Coordinates(lat, lon) => Ok(Coordinate::new(lat, lon)?),
        LocationInput::Name(_) => bail!("Expected coordinates as `lat,lon`, got: {text}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = AgriConfig::load()?;
    telemetry::init(&config.logging)?;
    let state = AppState::from_config(&config)?;

    let outcome = match command {
        Command::Advise(text) => advise(&state, &text).await,
        Command::Irrigation(text) => {
            let coordinate = parse_coordinate(&text)?;
            let today = chrono::Utc::now().date_naive();
            state
                .irrigation
                .plan(coordinate, today)
                .await
                .map(|plan| print_irrigation(&coordinate, &plan))
        }
        Command::Flood(text) => {
            let coordinate = parse_coordinate(&text)?;
            state
                .flood
                .assess(coordinate)
                .await
                .map(|assessment| print_flood(&coordinate, &assessment))
        }
        Command::Interactive => {
            interactive(&state).await?;
            Ok(())
        }
        Command::Serve { port } => {
            return web::run(state, port.unwrap_or(config.web.port)).await;
        }
        Command::Help => Ok(()),
    };

    if let Err(e) = outcome {
        eprintln!("❌ {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn advise(state: &AppState, text: &str) -> agrisense::Result<()> {
    let input = LocationParser::parse(text)?;
    let advice = state.advisor.advise(input).await?;
    print_advice(&advice);
    Ok(())
}

/// Every line starts a query; answers to lines superseded by a later one
/// are dropped.
async fn interactive(state: &AppState) -> Result<()> {
    let tracker = Arc::new(RequestTracker::new());
    let mut pending = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Enter a place name or `lat,lon` per line, Ctrl-D to quit.");

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let input = match LocationParser::parse(&line) {
            Ok(input) => input,
            Err(AgriError::LocationUnavailable { .. }) => continue,
            Err(e) => {
                eprintln!("❌ {}", e.user_message());
                continue;
            }
        };

        let advisor = Arc::clone(&state.advisor);
        let tracker = Arc::clone(&tracker);
        pending.spawn(async move {
            match advisor.advise_latest(&tracker, input).await {
                Ok(Tracked::Current(advice)) => print_advice(&advice),
                Ok(Tracked::Superseded) => {}
                Err(e) => eprintln!("❌ {}", e.user_message()),
            }
        });
    }

    while let Some(joined) = pending.join_next().await {
        joined.context("Advice task panicked")?;
    }
    Ok(())
}

fn print_advice(advice: &CropAdvice) {
    let location = &advice.location;
    println!("📍 {}", location.display_name());
    println!("   {}", location.coordinate.format());
    println!();
    println!("🌦️  Climate {}", advice.years);
    println!("   Temperature:   {:.1}°C", advice.summary.avg_temperature);
    println!(
        "   Rainfall:      {:.1} mm (≈ {:.0} mm per year)",
        advice.summary.avg_rainfall, advice.yearly_rainfall
    );
    println!("   Soil moisture: {:.2}", advice.summary.avg_soil_moisture);
    if advice.is_estimated() {
        println!("   ⚠️  Climate data unavailable, showing estimated values");
    }
    println!();

    if advice.crops.is_empty() {
        println!("No crops in the catalog suit these conditions.");
        return;
    }

    println!("🌱 Recommended crops ({})", advice.crops.len());
    for crop in &advice.crops {
        println!();
        println!("   {} ({} season)", crop.name, crop.season);
        println!(
            "   {} | {}",
            crop.format_temperature_range(),
            crop.format_rainfall_range()
        );
        println!("   {}", crop.description);
        println!("   Tip: {}", crop.tips);
    }
}

fn print_irrigation(coordinate: &Coordinate, plan: &IrrigationPlan) {
    println!("💧 Irrigation at {}", coordinate.format());
    println!(
        "   Recent rainfall: {:.1} mm/day",
        plan.average_precipitation
    );
    let action = match plan.status {
        IrrigationStatus::Increase => format!("Irrigate about {:.1} mm this week", plan.recommended),
        IrrigationStatus::Maintain => "Keep the current irrigation schedule".to_string(),
        IrrigationStatus::Decrease => {
            format!("Reduce irrigation, {:.1} mm surplus this week", -plan.deficit)
        }
    };
    println!("   {action}");
}

fn print_flood(coordinate: &Coordinate, assessment: &FloodAssessment) {
    println!("🌊 River discharge at {}", coordinate.format());
    println!(
        "   Latest: {:.1} m³/s (threshold {:.1} m³/s, {:.0}%)",
        assessment.latest_discharge, assessment.threshold, assessment.risk_percent
    );
    if assessment.warning {
        println!("   ⚠️  Flood warning: discharge at or above threshold");
    } else {
        println!("   No flood warning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&[])).unwrap(), Command::Help);
        assert_eq!(
            Command::parse(&args(&["New", "Delhi"])).unwrap(),
            Command::Advise("New Delhi".to_string())
        );
        assert_eq!(
            Command::parse(&args(&["flood", "25.6,85.1"])).unwrap(),
            Command::Flood("25.6,85.1".to_string())
        );
        assert_eq!(
            Command::parse(&args(&["serve", "--port", "9000"])).unwrap(),
            Command::Serve { port: Some(9000) }
        );
        assert_eq!(
            Command::parse(&args(&["serve"])).unwrap(),
            Command::Serve { port: None }
        );
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(Command::parse(&args(&["serve", "--port", "http"])).is_err());
        assert!(Command::parse(&args(&["serve", "--port"])).is_err());
    }

    #[test]
    fn test_parse_coordinate() {
        let coordinate = parse_coordinate("19.07 72.88").unwrap();
        assert_eq!(coordinate.latitude, 19.07);
        assert!(parse_coordinate("Mumbai").is_err());
    }
}
