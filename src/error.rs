use thiserror::Error;

use crate::loader::{ClassLoaderIdentity, ModuleResolutionError};

/// Diagnostic code emitted when a gateway module cannot be resolved.
pub(crate) const DIAG_GATEWAY_RESOLUTION: &str = "CGCL0001E";
/// Diagnostic code emitted when a class record fails validation.
pub(crate) const DIAG_MALFORMED_CLASS: &str = "CGCL0002E";

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! malformed_class_error {
    // Single string version
    ($class:expr, $msg:expr) => {
        crate::Error::MalformedClass {
            class: $class.to_string(),
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($class:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::MalformedClass {
            class: $class.to_string(),
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur while indexing class path
/// containers, resolving class names through a delegation chain, running the transformation
/// pipeline and managing the loader registry. Each variant provides specific context about
/// the failure mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Resolution Errors
/// - [`Error::NotFound`] - No loader in the delegation chain supplied the class
/// - [`Error::GatewayResolution`] - The gateway module for an application could not be wired
/// - [`Error::LoaderNotRegistered`] - A configuration referenced an unknown parent loader
/// - [`Error::DuplicateIdentity`] - Two loaders were created with the same identity
///
/// ## Class and Container Errors
/// - [`Error::MalformedClass`] - A class record failed validation after transformation
/// - [`Error::Malformed`] - Corrupted archive or manifest structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond an archive's boundaries
/// - [`Error::Transformer`] - A registered transformer failed while rewriting a class
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust,no_run
/// use classgate::{container::ArchiveContainer, Error};
/// use std::path::Path;
///
/// match ArchiveContainer::open(Path::new("apps/service/lib/service.jar")) {
///     Ok(archive) => {
///         println!("Archive indexed successfully");
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Broken archive: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => {
///         eprintln!("I/O error: {}", io_err);
///     }
///     Err(e) => {
///         eprintln!("Other error: {}", e);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Resolution Errors
    /// No loader in the delegation chain could supply the requested class.
    ///
    /// This is the only error that delegation falls through: a parent answering
    /// with `NotFound` lets the requesting loader continue with its own class
    /// path, and vice versa for parent-last loaders. Every other error aborts
    /// the load.
    #[error("Could not find class - {class}")]
    NotFound {
        /// The dot-separated binary name that was requested
        class: String,
    },

    /// The gateway module backing a top level class loader could not be resolved.
    ///
    /// Construction of a gateway loader wires a synthetic module into the
    /// module layer. When that wiring fails, the underlying resolution error is
    /// preserved here so callers can report the root cause instead of a bare
    /// internal failure.
    #[error("Failed to resolve gateway module {module}")]
    GatewayResolution {
        /// Name of the synthetic gateway module that failed to resolve
        module: String,
        /// The resolution failure reported by the module layer
        #[source]
        source: ModuleResolutionError,
    },

    /// A configuration referenced a parent loader that is not registered.
    ///
    /// Child class loaders are created against a parent identity. If no loader
    /// with that identity exists in the registry, the child cannot be built.
    #[error("No class loader registered for identity {0}")]
    LoaderNotRegistered(ClassLoaderIdentity),

    /// A second loader was created with an identity that is already registered.
    ///
    /// Loader identities are unique within a registry. Registration is atomic,
    /// so under concurrent creation exactly one caller succeeds and the others
    /// receive this error.
    #[error("A class loader with identity {0} already exists")]
    DuplicateIdentity(ClassLoaderIdentity),

    // Class and Container Errors
    /// A class record failed validation and cannot be defined.
    ///
    /// Validation runs after the transformation pipeline, so this variant
    /// covers both corrupted class path entries and transformers that produce
    /// invalid output. The source location where the malformation was detected
    /// is included for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `class` - The binary name of the class that failed validation
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed class {class} - {file}:{line}: {message}")]
    MalformedClass {
        /// The binary name of the class that failed validation
        class: String,
        /// The message to be printed for the malformed class
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An archive or manifest is damaged and could not be parsed.
    ///
    /// This error indicates that a container's structure is corrupted or does
    /// not conform to the expected format. The error includes the source
    /// location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing an archive.
    ///
    /// This error occurs when trying to read data beyond the end of an archive
    /// buffer. It's a safety check to prevent buffer overruns during parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A registered transformer failed while rewriting a class.
    ///
    /// Transformer failures are fatal for the load attempt: the class is not
    /// defined and the failure does not fall through to other loaders. The
    /// original error is preserved as the source.
    #[error("Transformer failed for class {class}")]
    Transformer {
        /// The binary name of the class being transformed
        class: String,
        /// The error raised by the transformer
        #[source]
        source: Box<Error>,
    },

    // I/O Errors
    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during container access
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for
    /// wrapping external failures with additional context.
    #[error("{0}")]
    Error(String),
}
