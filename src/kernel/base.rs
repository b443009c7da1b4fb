use super::{KernelError, Source};
use crate::platform::{BuildFailure, Platform};

/// Everything needed to build a kernel: source fragments and compile options.
///
/// Immutable once registered; replaced, never edited.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KernelBase {
    sources: Vec<Source>,
    options: Vec<String>,
    /// Work-group size hint for the dispatching side.
    local_range: Option<[u32; 3]>,
}

impl KernelBase {
    pub fn new(sources: Vec<Source>, options: Vec<String>) -> Self {
        Self {
            sources,
            options,
            local_range: None,
        }
    }

    pub fn with_local_range(mut self, local_range: [u32; 3]) -> Self {
        self.local_range = Some(local_range);
        self
    }

    #[inline]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    #[inline]
    pub fn local_range(&self) -> Option<[u32; 3]> {
        self.local_range
    }

    /// The single compilation unit: all fragments, in order.
    #[inline]
    pub fn source(&self) -> String {
        self.sources.join("\n")
    }

    /// Compile options joined by single spaces.
    #[inline]
    pub fn options(&self) -> String {
        self.options.join(" ")
    }

    /// Builds the program in `context`, reporting the build log of every device.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub fn build<P: Platform>(
        &self,
        platform: &P,
        context: &P::Context,
    ) -> Result<P::Program, KernelError> {
        let source = self.source();
        let options = self.options();
        log::info!("building program with options [{options}]");

        let now = instant::Instant::now();
        match platform.build_program(context, &source, &options) {
            Ok(program) => {
                log::info!("program built in {:?}", now.elapsed());
                for entry in platform.build_logs(context, &program) {
                    match entry.is_empty() {
                        true => log::info!("build log for device {}: all clear!", entry.device),
                        false => log::info!("{entry}"),
                    }
                }
                Ok(program)
            }
            Err(BuildFailure { error, logs }) => {
                let err = KernelError::Build {
                    code: error.code,
                    message: error.message,
                    logs,
                };
                log::error!("{err}");
                Err(err)
            }
        }
    }
}
