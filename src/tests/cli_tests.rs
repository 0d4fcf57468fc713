use clap::Parser;

use crate::{cleanup_options, Cli, Commands, TransportCmd};

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("millbook").chain(args.iter().copied()))
}

#[test]
fn dry_run_and_delete_cannot_be_combined() {
    assert!(parse(&["cleanup-workers", "--dry-run", "--delete"]).is_err());

    let cli = parse(&["cleanup-workers", "--delete", "--month", "2024-09"]).unwrap();
    match cli.command {
        Commands::CleanupWorkers {
            dry_run,
            delete,
            month,
            marker_only,
        } => {
            let opts = cleanup_options(dry_run, delete, month, marker_only);
            assert!(opts.delete);
            assert_eq!(opts.month.as_deref(), Some("2024-09"));
        }
        _ => panic!("expected cleanup-workers"),
    }
}

#[test]
fn dry_run_wins_over_delete() {
    assert!(!cleanup_options(true, true, None, false).delete);
    assert!(!cleanup_options(false, false, None, false).delete);
}

#[test]
fn gps_accepts_negative_coordinates() {
    let cli = parse(&["transport", "gps", "-33.86", "151.2"]).unwrap();
    match cli.command {
        Commands::Transport(TransportCmd::Gps { lat, lng }) => {
            assert_eq!(lat, -33.86);
            assert_eq!(lng, 151.2);
        }
        _ => panic!("expected transport gps"),
    }
}

#[test]
fn loan_due_dates_must_be_dates() {
    assert!(parse(&[
        "loans", "add", "Perera Stores", "--rice-type", "Nadu", "--quantity", "500",
        "--amount", "90000", "--due", "2024-12-31",
    ])
    .is_ok());
    assert!(parse(&[
        "loans", "add", "Perera Stores", "--rice-type", "Nadu", "--quantity", "500",
        "--amount", "90000", "--due", "next week",
    ])
    .is_err());
}
