use crate::error::EngineResult;
use crate::filter_view::{EventFilter, ViewState, DEFAULT_PAGE_SIZE};
use crate::models::{Protocol, TrafficStatus};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Client de supervision du trafic réseau classifié par le serveur CyberShield
#[derive(Debug, Parser)]
#[command(name = "cybershield", version, about)]
pub struct Cli {
    /// Fichier de configuration (défaut: /etc/cybershield/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Utilise le générateur de trafic local au lieu du serveur
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tableau de bord temps réel (Ctrl+C pour quitter)
    Watch(ViewArgs),
    /// Un seul pull, affiché puis quitte
    Snapshot(ViewArgs),
    /// Résout toutes les alertes côté serveur
    ClearAlerts,
    /// Télécharge le rapport CSV
    Report {
        #[arg(short, long, default_value = "cybershield_report.csv")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Filtre par statut (normal, suspicious, attack)
    #[arg(long)]
    pub status: Option<TrafficStatus>,

    /// Filtre par protocole (tcp, udp, icmp, other)
    #[arg(long)]
    pub protocol: Option<Protocol>,

    /// Sous-chaîne recherchée dans l'IP source ou destination
    #[arg(long)]
    pub ip: Option<String>,

    /// Page affichée, à partir de 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl ViewArgs {
    pub fn filter(&self) -> EventFilter {
        EventFilter {
            status: self.status,
            protocol: self.protocol,
            ip_substring: self.ip.clone().filter(|ip| !ip.is_empty()),
        }
    }

    /// Index de page interne (à partir de 0)
    pub fn page_index(&self) -> usize {
        self.page.saturating_sub(1)
    }
}

/// Commande saisie sur l'entrée standard pendant `watch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAction {
    /// Ligne vide : simple réaffichage
    Redraw,
    Refresh,
    ClearAlerts,
    Status(Option<TrafficStatus>),
    Protocol(Option<Protocol>),
    Ip(Option<String>),
    ClearFilters,
    NextPage,
    PreviousPage,
    /// Page demandée, à partir de 1
    Page(usize),
    PageSize(usize),
    Quit,
}

impl DashboardAction {
    pub const HELP: &'static str = "Commandes: r=rafraîchir  c=effacer alertes  status <statut|*>  proto <protocole|*>  ip [texte]  x=sans filtre  n/p=page suiv./préc.  page <n>  size <n>  q=quitter";

    /// Applique une action de présentation à l'état de vue.
    ///
    /// `page_count` borne l'avance de page ; les actions qui ne touchent pas la vue
    /// sont sans effet ici.
    pub fn apply(&self, view_state: &mut ViewState, page_count: usize) -> EngineResult<()> {
        match self {
            DashboardAction::Status(status) => view_state.set_status(*status),
            DashboardAction::Protocol(protocol) => view_state.set_protocol(*protocol),
            DashboardAction::Ip(needle) => view_state.set_ip_substring(needle.clone()),
            DashboardAction::ClearFilters => view_state.clear_filters(),
            DashboardAction::NextPage => {
                if view_state.page().index + 1 < page_count {
                    view_state.next_page();
                }
            }
            DashboardAction::PreviousPage => view_state.previous_page(),
            DashboardAction::Page(number) => view_state.set_page(number.saturating_sub(1)),
            DashboardAction::PageSize(size) => view_state.set_page_size(*size)?,
            DashboardAction::Redraw
            | DashboardAction::Refresh
            | DashboardAction::ClearAlerts
            | DashboardAction::Quit => {}
        }
        Ok(())
    }
}

/// `*` ou absence d'argument retire le filtre
fn optional<T: FromStr<Err = String>>(arg: Option<&str>) -> Result<Option<T>, String> {
    match arg {
        None | Some("*") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

fn number(arg: Option<&str>, command: &str) -> Result<usize, String> {
    let raw = arg.ok_or_else(|| format!("{}: nombre attendu", command))?;
    raw.parse()
        .map_err(|_| format!("{}: nombre invalide '{}'", command, raw))
}

impl FromStr for DashboardAction {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(DashboardAction::Redraw);
        };
        let arg = parts.next();

        match command.to_lowercase().as_str() {
            "r" | "refresh" => Ok(DashboardAction::Refresh),
            "c" | "clear" => Ok(DashboardAction::ClearAlerts),
            "status" | "s" => optional(arg).map(DashboardAction::Status),
            "proto" | "protocol" => optional(arg).map(DashboardAction::Protocol),
            "ip" => Ok(DashboardAction::Ip(arg.map(str::to_string))),
            "x" | "reset" => Ok(DashboardAction::ClearFilters),
            "n" | "next" => Ok(DashboardAction::NextPage),
            "p" | "prev" => Ok(DashboardAction::PreviousPage),
            "page" => number(arg, "page").map(DashboardAction::Page),
            "size" => number(arg, "size").map(DashboardAction::PageSize),
            "q" | "quit" | "exit" => Ok(DashboardAction::Quit),
            other => Err(format!("commande inconnue: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_with_filters() {
        let cli = Cli::try_parse_from([
            "cybershield", "--simulate", "watch", "--status", "attack", "--protocol", "tcp", "--ip", "10.0", "--page", "2",
        ])
        .unwrap();

        assert!(cli.simulate);
        match cli.command {
            Command::Watch(args) => {
                let filter = args.filter();
                assert_eq!(filter.status, Some(TrafficStatus::Attack));
                assert_eq!(filter.protocol, Some(Protocol::Tcp));
                assert_eq!(filter.ip_substring.as_deref(), Some("10.0"));
                assert_eq!(args.page_index(), 1);
                assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);
            }
            other => panic!("commande inattendue: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["cybershield", "snapshot", "--status", "bizarre"]).is_err());
    }

    #[test]
    fn test_dashboard_commands_are_parsed() {
        assert_eq!("".parse::<DashboardAction>(), Ok(DashboardAction::Redraw));
        assert_eq!("r".parse::<DashboardAction>(), Ok(DashboardAction::Refresh));
        assert_eq!("clear".parse::<DashboardAction>(), Ok(DashboardAction::ClearAlerts));
        assert_eq!("status attack".parse::<DashboardAction>(), Ok(DashboardAction::Status(Some(TrafficStatus::Attack))));
        assert_eq!("status *".parse::<DashboardAction>(), Ok(DashboardAction::Status(None)));
        assert_eq!("proto udp".parse::<DashboardAction>(), Ok(DashboardAction::Protocol(Some(Protocol::Udp))));
        assert_eq!("ip 192.168".parse::<DashboardAction>(), Ok(DashboardAction::Ip(Some("192.168".to_string()))));
        assert_eq!("ip".parse::<DashboardAction>(), Ok(DashboardAction::Ip(None)));
        assert_eq!("  page 3 ".parse::<DashboardAction>(), Ok(DashboardAction::Page(3)));
        assert_eq!("size 25".parse::<DashboardAction>(), Ok(DashboardAction::PageSize(25)));
        assert_eq!("Q".parse::<DashboardAction>(), Ok(DashboardAction::Quit));

        assert!("status bizarre".parse::<DashboardAction>().is_err());
        assert!("page".parse::<DashboardAction>().is_err());
        assert!("size abc".parse::<DashboardAction>().is_err());
        assert!("reboot".parse::<DashboardAction>().is_err());
    }

    #[test]
    fn test_dashboard_actions_drive_view_state() {
        let mut view = ViewState::default();

        DashboardAction::Status(Some(TrafficStatus::Suspicious)).apply(&mut view, 1).unwrap();
        DashboardAction::Ip(Some("10.0".to_string())).apply(&mut view, 1).unwrap();
        assert_eq!(view.filter().status, Some(TrafficStatus::Suspicious));
        assert_eq!(view.filter().ip_substring.as_deref(), Some("10.0"));

        // Pas d'avance au-delà de la dernière page
        DashboardAction::NextPage.apply(&mut view, 1).unwrap();
        assert_eq!(view.page().index, 0);
        DashboardAction::NextPage.apply(&mut view, 3).unwrap();
        assert_eq!(view.page().index, 1);
        DashboardAction::PreviousPage.apply(&mut view, 3).unwrap();
        assert_eq!(view.page().index, 0);

        DashboardAction::Page(3).apply(&mut view, 3).unwrap();
        assert_eq!(view.page().index, 2);
        DashboardAction::PageSize(20).apply(&mut view, 3).unwrap();
        assert_eq!(view.page().index, 0);
        assert!(DashboardAction::PageSize(0).apply(&mut view, 3).is_err());

        DashboardAction::ClearFilters.apply(&mut view, 3).unwrap();
        assert!(view.filter().is_empty());
        assert_eq!(view.page().size, 20);
    }

    #[test]
    fn test_report_default_output() {
        let cli = Cli::try_parse_from(["cybershield", "report"]).unwrap();
        match cli.command {
            Command::Report { output } => assert_eq!(output, PathBuf::from("cybershield_report.csv")),
            other => panic!("commande inattendue: {:?}", other),
        }
    }
}
