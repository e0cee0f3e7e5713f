use std::{fmt, str::FromStr};

/// The compute backends a vector space can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend {0:?}, expected \"cpu\" or \"cuda\"")]
pub struct UnknownBackend(pub String);

impl Backend {
    /// Environment variable consulted by [`Backend::from_env`].
    pub const ENV_VAR: &'static str = "FNSPACE_BACKEND";

    pub const fn name(self) -> &'static str {
        match self {
            Backend::Cpu => "cpu",
            Backend::Cuda => "cuda",
        }
    }

    /// Whether support for this backend was compiled in.
    pub const fn is_compiled(self) -> bool {
        match self {
            Backend::Cpu => true,
            Backend::Cuda => cfg!(feature = "cuda"),
        }
    }

    /// Whether the backend can be used in this process.
    ///
    /// For CUDA this runs the capability probe on first call; the answer is
    /// cached for the lifetime of the process.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Cpu => true,
            #[cfg(feature = "cuda")]
            Backend::Cuda => crate::device::cuda::probe().is_ok(),
            #[cfg(not(feature = "cuda"))]
            Backend::Cuda => false,
        }
    }

    /// Whether default device spaces may be created on this backend.
    ///
    /// Setting `FNSPACE_BACKEND=cpu` turns CUDA off. The CPU is never turned off.
    pub fn is_enabled(self) -> bool {
        self == Backend::Cpu || self.enabled_under(Backend::from_env())
    }

    fn enabled_under(self, selected: Backend) -> bool {
        self == Backend::Cpu || self == selected
    }

    /// Picks the requested backend if it is available, falling back to
    /// the fastest available one otherwise.
    pub fn select(requested: Option<Backend>) -> Backend {
        Self::select_with(requested, Backend::is_available)
    }

    fn select_with(requested: Option<Backend>, available: impl Fn(Backend) -> bool) -> Backend {
        if let Some(backend) = requested {
            if available(backend) {
                return backend;
            }
            tracing::warn!(backend = %backend, "requested backend is unavailable, falling back");
        }
        if available(Backend::Cuda) {
            Backend::Cuda
        } else {
            Backend::Cpu
        }
    }

    /// Selects a backend honouring the `FNSPACE_BACKEND` environment variable.
    pub fn from_env() -> Backend {
        let requested = match std::env::var(Self::ENV_VAR) {
            Ok(value) => match value.parse() {
                Ok(backend) => Some(backend),
                Err(err) => {
                    tracing::warn!(%err, "ignoring {}", Self::ENV_VAR);
                    None
                }
            },
            Err(_) => None,
        };
        Self::select(requested)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "numpy" => Ok(Backend::Cpu),
            "cuda" | "gpu" => Ok(Backend::Cuda),
            _ => Err(UnknownBackend(s.to_owned())),
        }
    }
}
