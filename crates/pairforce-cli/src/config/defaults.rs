pub struct DefaultsConfig {
    pub force_path: &'static str,
    pub per_particle_energy: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            force_path: "force.toml",
            per_particle_energy: false,
        }
    }
}
