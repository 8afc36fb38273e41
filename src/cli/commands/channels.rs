use crate::cli::commands::open_store;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::channels::ChannelConfig;
use crate::ui::messages::{info, success, warning};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Channels { set, print, clear } = cmd {
        let store = open_store(cfg)?;

        if *clear {
            if store.clear_channels()? {
                store.audit("channels", "clear", "Clock channels removed")?;
                success("Clock channels removed.");
            } else {
                warning("Clock channels were not initialized.");
            }
        }

        if !set.is_empty() {
            let channels =
                ChannelConfig::from_pairs(set.iter().map(String::as_str)).map_err(AppError::Config)?;
            store.initialize_channels(&channels)?;
            store.audit(
                "channels",
                "set",
                &format!("Clock channels stored under category {}", channels.category_id),
            )?;
            success("Clock channels stored.");
        }

        if *print {
            let channels = store.load_channels()?;
            info("Clock channels:");
            println!("    category             {}", channels.category_id);
            println!("    clock-in channel     {}", channels.clock_in_channel_id);
            println!("    clock-in interface   {}", channels.clock_in_interface_id);
            println!("    clock-out channel    {}", channels.clock_out_channel_id);
            println!("    clock-out interface  {}", channels.clock_out_interface_id);
            println!("    admin channel        {}", channels.admin_channel_id);
            println!("    clocked-in role      {}", channels.clock_in_role_id);
        }
    }

    Ok(())
}
