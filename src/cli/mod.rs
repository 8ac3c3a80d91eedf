use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Register the plugin with the host listening at ENDPOINT
    Startup { endpoint: String },

    /// Pull new records from the source into the raw relation
    Collect {
        /// JSON connection context (connection_id, db_url, ...)
        ctx: String,
        /// Stream name, as a JSON string or bare
        stream: String,
    },

    /// Project raw records onto tool entities
    Extract { ctx: String, stream: String },

    /// Map tool entities to domain entities
    Convert { ctx: String, stream: String },

    /// Print every (stream, stage) subtask
    ListSubtasks,

    /// Print the registration descriptor without contacting the host
    PluginInfo,

    /// Invoke a plugin API handler
    Call {
        handler: String,
        ctx: String,

        #[arg(default_value = "{}")]
        input: String,
    },

    /// `<handler> <ctx> <input>`: invoke a registered API handler by name
    #[command(external_subcommand)]
    Handler(Vec<String>),
}
