//! Persistent state of the reporter: settings, plugin records, run marker.
//!
//! Everything lives in a key/value option store. Values are written whole;
//! there are no partial updates.

pub mod clock;
pub mod error;
pub mod inventory;
pub mod plugin_storage;
pub mod record;
pub mod registry;
pub mod settings;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod transient;

pub use {
    clock::{Clock, DAY_IN_SECONDS, ManualClock, SystemClock},
    error::{Error, Result},
    inventory::{FileInventory, Inventory, InventoryPlugin, InventorySource, MemoryInventory},
    plugin_storage::{PLUGIN_LIST_KEY, PluginStorage},
    record::{ErrorInfo, PluginRecord, slug_from_plugin_id},
    registry::{InstalledPlugin, Registry},
    settings::{
        SETTINGS_KEY, Settings, SettingsStore, SettingsUpdate, TrialPeriod, ValidatedSettings,
        ValidationMessage, normalize_trial_period,
    },
    store::{OptionStore, load_option, save_option},
    store_file::FileOptionStore,
    store_memory::InMemoryOptionStore,
    transient::Transient,
};
