use clap::{Args, Subcommand, ValueEnum};
use nimbus_api::requests::RequestStatus;
use nimbus_api::users::{Theme, Role};
use nimbus_lib::size::SizeUnit;

use crate::error;
use crate::formatting::{self, Table};

use super::{Session, parse_size_arg};

#[derive(Debug, Args)]
pub struct RequestsArgs {
    #[command(subcommand)]
    command: Option<RequestCmds>
}

#[derive(Debug, Subcommand)]
enum RequestCmds {
    /// asks for a larger storage quota
    Submit {
        /// requested quota. examples: 50GB, 1TB
        #[arg(value_parser(parse_size_arg))]
        size: (f64, SizeUnit),

        #[arg(short, long)]
        reason: Option<String>,
    },

    /// approves a pending request, admin only
    Approve {
        id: String,
    },

    /// rejects a pending request, admin only
    Reject {
        id: String,
    },
}

pub fn requests(session: &Session, args: RequestsArgs) -> error::Result {
    let requests = &session.requests;

    match args.command {
        None => {
            let list = session.block_on(requests.list())?;
            let mut table = Table::new(["id", "user", "requested", "status", "created", "reason"]);

            for request in list {
                table.row(vec![
                    request.id.clone(),
                    request.username.clone().unwrap_or_else(|| request.user_id.clone()),
                    formatting::bytes_to_unit(request.requested.total_bytes()),
                    format!("{:?}", request.status).to_lowercase(),
                    formatting::datetime(&request.created_at),
                    request.reason.clone().unwrap_or_default(),
                ]);
            }

            if table.is_empty() {
                println!("no storage requests");
            } else {
                print!("{}", table.render());
            }
        },
        Some(RequestCmds::Submit { size: (total, unit), reason }) => {
            let created = session.block_on(requests.submit(total, unit, reason))?;

            println!("submitted request {} for {total} {unit}", created.id);
        },
        Some(RequestCmds::Approve { id }) => {
            session.block_on(requests.set_status(&id, RequestStatus::Approved))?;

            // an approval can change the quota of the current user
            session.block_on(session.store.fetch_disks())?;

            println!("approved {id}");
        },
        Some(RequestCmds::Reject { id }) => {
            session.block_on(requests.set_status(&id, RequestStatus::Rejected))?;

            println!("rejected {id}");
        }
    }

    Ok(())
}

#[derive(Debug, Clone, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    System,
}

impl From<ThemeArg> for Theme {
    fn from(given: ThemeArg) -> Self {
        match given {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::System => Theme::System,
        }
    }
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    command: Option<SettingsCmds>
}

#[derive(Debug, Subcommand)]
enum SettingsCmds {
    Theme {
        theme: ThemeArg,
    },
    Accent {
        /// css color such as "#3b82f6"
        color: String,
    },
    Font {
        family: String,
    },
    Scale {
        scale: f32,
    },
    Motion {
        /// reduces animations when set
        #[arg(action = clap::ArgAction::Set)]
        reduce: bool,
    },
    /// sends the current settings to the server right away
    Sync,
}

pub fn settings(session: &Session, args: SettingsArgs) -> error::Result {
    let settings = session.store.settings();

    match args.command {
        None => {
            let appearance = settings.appearance();

            if let Some(profile) = session.store.profile() {
                let role = match profile.role {
                    Role::Admin => "admin",
                    Role::User => "user",
                };

                println!("user: {} ({role})", profile.username);
                println!("quota: {}", formatting::bytes_to_unit(profile.quota.total_bytes()));
            }

            println!("theme: {:?}", appearance.theme);
            println!("accent: {}", appearance.accent_color);
            println!("font: {} x{}", appearance.font_family, appearance.font_scale);
            println!("reduce motion: {}", appearance.reduce_motion);
            println!("pinned: {}", settings.pinned().len());

            return Ok(());
        },
        Some(SettingsCmds::Sync) => {
            session.block_on(settings.sync_settings_to_backend_now())?;
            session.settings_changed.set(false);

            println!("settings synced");

            return Ok(());
        },
        Some(SettingsCmds::Scale { scale }) if !(0.5..=2.0).contains(&scale) => {
            return Err(error::Error::input("font scale must be between 0.5 and 2.0"));
        },
        Some(cmd) => {
            session.block_on(settings.update_appearance(move |appearance| match cmd {
                SettingsCmds::Theme { theme } => appearance.theme = theme.into(),
                SettingsCmds::Accent { color } => appearance.accent_color = color,
                SettingsCmds::Font { family } => appearance.font_family = family,
                SettingsCmds::Scale { scale } => appearance.font_scale = scale,
                SettingsCmds::Motion { reduce } => appearance.reduce_motion = reduce,
                SettingsCmds::Sync => {},
            }));

            session.settings_changed.set(true);

            println!("updated, syncing shortly");
        }
    }

    Ok(())
}
