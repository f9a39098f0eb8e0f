use std::io::{self, BufRead, Write};
use std::process;

use clap::Parser;
use colored::Colorize;
use lepton_calc::config::AngleUnit;
use lepton_calc::errors::CalcError;
use lepton_calc::features::FeatureSet;
use lepton_calc::session::{Calculator, Radix};

#[derive(Parser)]
#[command(name = "lepton")]
#[command(about = "Evaluate, differentiate and solve calculator expressions")]
#[command(version)]
struct Args {
    /// Expression to evaluate. Lines are read from stdin when omitted
    expression: Option<String>,

    /// Interpret trigonometric angles in degrees
    #[arg(long)]
    degrees: bool,

    /// Disable a function or category (variables, complex, matrices, graphing)
    #[arg(long, value_name = "NAME")]
    disable: Vec<String>,

    /// Disable features from a numeric feature mask
    #[arg(long, value_name = "MASK")]
    feature_mask: Option<u64>,

    /// Output radix: decimal, binary, octal or hex
    #[arg(long, default_value = "decimal")]
    radix: Radix,

    /// Print the derivative with respect to VAR instead of evaluating
    #[arg(long, value_name = "VAR")]
    derive: Option<String>,

    /// Bind a variable before evaluating
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_binding)]
    bindings: Vec<(String, f64)>,

    /// Log parser and evaluation details
    #[arg(short, long)]
    verbose: bool,
}

fn parse_binding(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut calc = build_calculator(&args);

    match &args.expression {
        Some(expression) => match run_line(&mut calc, expression, args.derive.as_deref()) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                process::exit(1);
            }
        },
        None => {
            if let Err(e) = repl(&mut calc, args.derive.as_deref()) {
                eprintln!("{}", e.to_string().red());
                process::exit(1);
            }
        }
    }
}

fn build_calculator(args: &Args) -> Calculator {
    let mut calc = Calculator::new();
    if args.degrees {
        calc.set_angle_unit(AngleUnit::Degrees);
    }
    if let Some(mask) = args.feature_mask {
        calc.set_disabled(FeatureSet::from_bits(mask));
    }
    for name in &args.disable {
        calc.disable(name);
    }
    for (name, value) in &args.bindings {
        calc.set_variable(name.clone(), *value);
    }
    calc.set_radix(args.radix);
    calc
}

fn run_line(calc: &mut Calculator, line: &str, derive: Option<&str>) -> Result<String, CalcError> {
    match derive {
        Some(variable) => Ok(calc.derive(line, variable)?.to_string()),
        None => calc.evaluate_to_string(line),
    }
}

fn repl(calc: &mut Calculator, derive: Option<&str>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "{} ", ">".cyan())?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if matches!(line, "quit" | "exit") {
            break;
        }
        if !line.is_empty() {
            match run_line(calc, line, derive) {
                Ok(output) => writeln!(stdout, "{}", output.green())?,
                Err(e) => writeln!(stdout, "{}", e.to_string().red())?,
            }
        }
        write!(stdout, "{} ", ">".cyan())?;
        stdout.flush()?;
    }
    writeln!(stdout)
}
