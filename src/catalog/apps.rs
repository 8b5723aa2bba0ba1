//! The curated application set for the Pi image.

use super::{ApplicationSpec, BinaryProbe, InstalledProbe, SourceLocator, VersionStrategy};
use crate::build::{Cmd, InstallMethod, Recipe};
use crate::common::desktop::{MenuAction, MenuTweak};

const NO_STEPS: &[Cmd] = &[];

/// Build stack shared by the w1hkj suite (fldigi, flrig, flmsg). Installed
/// once per run no matter how many of the family are requested.
const W1HKJ_DEPS: &[&str] = &[
    "build-essential",
    "libfltk1.3-dev",
    "libjpeg62-turbo-dev",
    "libxft-dev",
    "libxinerama-dev",
    "libxcursor-dev",
    "libsndfile1-dev",
    "libsamplerate0-dev",
    "portaudio19-dev",
    "libpulse-dev",
    "libusb-1.0-0-dev",
];

const DEB_RADIO_DEPS: &[&str] = &[
    "libgfortran5",
    "libqt5multimedia5-plugins",
    "libqt5serialport5",
    "libqt5sql5-sqlite",
    "libfftw3-single3",
];

pub static CATALOG: &[ApplicationSpec] = &[
    ApplicationSpec {
        id: "hamlib",
        description: "Radio control library used by most other applications",
        strategy: VersionStrategy::GitRepo,
        source: SourceLocator::Git {
            url: "https://github.com/Hamlib/Hamlib.git",
        },
        recipe: Recipe {
            configure: &[
                Cmd { program: "./bootstrap", args: &[] },
                Cmd { program: "./configure", args: &[] },
            ],
            build: &[Cmd { program: "make", args: &["-j4"] }],
            install: InstallMethod::CheckInstall {
                pkgname: "hamlib",
                subdir: None,
            },
            swap_mb: None,
            menu: None,
        },
        dependencies: &[
            "build-essential",
            "automake",
            "autoconf",
            "libtool",
            "texinfo",
            "libusb-1.0-0-dev",
        ],
        optional: false,
    },
    ApplicationSpec {
        id: "fldigi",
        description: "Digital mode terminal (PSK, RTTY, Olivia, ...)",
        strategy: VersionStrategy::ScrapedPage {
            url: "http://www.w1hkj.com/files/fldigi/",
            pattern: r"fldigi-([0-9][0-9.]*)\.tar\.gz",
            installed: InstalledProbe::Binary(BinaryProbe {
                binary: "fldigi",
                args: &["--version"],
                pattern: r"fldigi\s+([0-9][0-9.]*)",
            }),
        },
        source: SourceLocator::DownloadPage {
            page: "http://www.w1hkj.com/files/fldigi/",
            link_pattern: r#"href="(fldigi-[0-9][0-9.]*\.tar\.gz)""#,
        },
        recipe: Recipe {
            configure: &[Cmd { program: "./configure", args: &[] }],
            build: &[Cmd { program: "make", args: &["-j4"] }],
            install: InstallMethod::CheckInstall {
                pkgname: "fldigi",
                subdir: None,
            },
            swap_mb: Some(2048),
            menu: Some(MenuTweak {
                entry: "flarq.desktop",
                action: MenuAction::Hide,
            }),
        },
        dependencies: W1HKJ_DEPS,
        optional: false,
    },
    ApplicationSpec {
        id: "flrig",
        description: "Transceiver control companion for fldigi",
        strategy: VersionStrategy::ScrapedPage {
            url: "http://www.w1hkj.com/files/flrig/",
            pattern: r"flrig-([0-9][0-9.]*)\.tar\.gz",
            installed: InstalledProbe::Binary(BinaryProbe {
                binary: "flrig",
                args: &["--version"],
                pattern: r"flrig\s+([0-9][0-9.]*)",
            }),
        },
        source: SourceLocator::DownloadPage {
            page: "http://www.w1hkj.com/files/flrig/",
            link_pattern: r#"href="(flrig-[0-9][0-9.]*\.tar\.gz)""#,
        },
        recipe: Recipe {
            configure: &[Cmd { program: "./configure", args: &[] }],
            build: &[Cmd { program: "make", args: &["-j4"] }],
            install: InstallMethod::CheckInstall {
                pkgname: "flrig",
                subdir: None,
            },
            swap_mb: None,
            menu: None,
        },
        dependencies: W1HKJ_DEPS,
        optional: false,
    },
    ApplicationSpec {
        id: "flmsg",
        description: "Formatted message manager for emcomm traffic",
        strategy: VersionStrategy::ScrapedPage {
            url: "http://www.w1hkj.com/files/flmsg/",
            pattern: r"flmsg-([0-9][0-9.]*)\.tar\.gz",
            installed: InstalledProbe::Binary(BinaryProbe {
                binary: "flmsg",
                args: &["--version"],
                pattern: r"flmsg\s+([0-9][0-9.]*)",
            }),
        },
        source: SourceLocator::DownloadPage {
            page: "http://www.w1hkj.com/files/flmsg/",
            link_pattern: r#"href="(flmsg-[0-9][0-9.]*\.tar\.gz)""#,
        },
        recipe: Recipe {
            configure: &[Cmd { program: "./configure", args: &[] }],
            build: &[Cmd { program: "make", args: &["-j4"] }],
            install: InstallMethod::CheckInstall {
                pkgname: "flmsg",
                subdir: None,
            },
            swap_mb: None,
            menu: None,
        },
        dependencies: W1HKJ_DEPS,
        optional: false,
    },
    ApplicationSpec {
        id: "wsjtx",
        description: "Weak-signal modes (FT8, FT4, JT65, WSPR)",
        strategy: VersionStrategy::ScrapedPage {
            url: "https://wsjt.sourceforge.io/wsjtx.html",
            pattern: r"wsjtx_([0-9][0-9.]*)_armhf\.deb",
            installed: InstalledProbe::Package("wsjtx"),
        },
        source: SourceLocator::DownloadPage {
            page: "https://wsjt.sourceforge.io/wsjtx.html",
            link_pattern: r#"href="([^"]*wsjtx_[0-9][0-9.]*_armhf\.deb)""#,
        },
        recipe: Recipe {
            configure: NO_STEPS,
            build: NO_STEPS,
            install: InstallMethod::Deb,
            swap_mb: None,
            menu: None,
        },
        dependencies: DEB_RADIO_DEPS,
        optional: false,
    },
    ApplicationSpec {
        id: "js8call",
        description: "Keyboard-to-keyboard weak-signal chat built on FT8",
        strategy: VersionStrategy::ScrapedPage {
            url: "http://files.js8call.com/latest.html",
            pattern: r"js8call_([0-9][0-9.]*)_armhf\.deb",
            installed: InstalledProbe::Package("js8call"),
        },
        source: SourceLocator::DownloadPage {
            page: "http://files.js8call.com/latest.html",
            link_pattern: r#"href="([^"]*js8call_[0-9][0-9.]*_armhf\.deb)""#,
        },
        recipe: Recipe {
            configure: NO_STEPS,
            build: NO_STEPS,
            install: InstallMethod::Deb,
            swap_mb: None,
            menu: None,
        },
        dependencies: DEB_RADIO_DEPS,
        // The js8call mirror disappears for days at a time; do not let it
        // take the rest of a run down with it.
        optional: true,
    },
    ApplicationSpec {
        id: "direwolf",
        description: "Software TNC for packet and APRS",
        strategy: VersionStrategy::GitRepo,
        source: SourceLocator::Git {
            url: "https://github.com/wb2osz/direwolf.git",
        },
        recipe: Recipe {
            configure: &[Cmd {
                program: "cmake",
                args: &["-B", "build", "-DCMAKE_BUILD_TYPE=Release", "."],
            }],
            build: &[Cmd {
                program: "cmake",
                args: &["--build", "build", "-j4"],
            }],
            install: InstallMethod::CheckInstall {
                pkgname: "direwolf",
                subdir: Some("build"),
            },
            swap_mb: None,
            menu: None,
        },
        dependencies: &[
            "build-essential",
            "cmake",
            "libasound2-dev",
            "libudev-dev",
            "libavahi-client-dev",
        ],
        optional: false,
    },
    ApplicationSpec {
        id: "pat",
        description: "Winlink client for radio email",
        strategy: VersionStrategy::ScrapedPage {
            url: "https://getpat.io/download/",
            pattern: r"pat_([0-9][0-9.]*)_linux_armhf\.deb",
            installed: InstalledProbe::Package("pat"),
        },
        source: SourceLocator::DownloadPage {
            page: "https://getpat.io/download/",
            link_pattern: r#"href="([^"]*pat_[0-9][0-9.]*_linux_armhf\.deb)""#,
        },
        recipe: Recipe {
            configure: NO_STEPS,
            build: NO_STEPS,
            install: InstallMethod::Deb,
            swap_mb: None,
            menu: None,
        },
        dependencies: &[],
        optional: false,
    },
    ApplicationSpec {
        id: "xastir",
        description: "APRS client with map display",
        strategy: VersionStrategy::PackageManager { package: "xastir" },
        source: SourceLocator::AptPackage { package: "xastir" },
        recipe: Recipe {
            configure: NO_STEPS,
            build: NO_STEPS,
            install: InstallMethod::Apt { package: "xastir" },
            swap_mb: None,
            menu: None,
        },
        dependencies: &[],
        optional: false,
    },
    ApplicationSpec {
        id: "qsstv",
        description: "Slow-scan television transmit and receive",
        strategy: VersionStrategy::PackageManager { package: "qsstv" },
        source: SourceLocator::AptPackage { package: "qsstv" },
        recipe: Recipe {
            configure: NO_STEPS,
            build: NO_STEPS,
            install: InstallMethod::Apt { package: "qsstv" },
            swap_mb: None,
            // The archive package hides its entry behind the HamRadio
            // category, which the stock menu does not show.
            menu: Some(MenuTweak {
                entry: "qsstv.desktop",
                action: MenuAction::Show,
            }),
        },
        dependencies: &[],
        optional: false,
    },
    ApplicationSpec {
        id: "voacapl",
        description: "VOACAP HF propagation prediction engine",
        strategy: VersionStrategy::VersionFlag {
            probe: BinaryProbe {
                binary: "voacapl",
                args: &["-v"],
                pattern: r"voacapl\s+v?([0-9][0-9.]*)",
            },
            // Upstream releases are years apart; the pin moves with the
            // catalog itself.
            latest: "0.7.6",
        },
        source: SourceLocator::Git {
            url: "https://github.com/jawatson/voacapl.git",
        },
        recipe: Recipe {
            configure: &[
                Cmd { program: "./autogen.sh", args: &[] },
                Cmd { program: "./configure", args: &[] },
            ],
            build: &[Cmd { program: "make", args: &["-j4"] }],
            install: InstallMethod::CheckInstall {
                pkgname: "voacapl",
                subdir: None,
            },
            swap_mb: None,
            menu: None,
        },
        dependencies: &["build-essential", "automake", "autoconf", "gfortran"],
        optional: false,
    },
    ApplicationSpec {
        id: "ardop",
        description: "ARDOP TNC binary (no version signal; --force to reinstall)",
        strategy: VersionStrategy::Manual,
        source: SourceLocator::DownloadPage {
            page: "https://www.cantab.net/users/john.wiseman/Downloads/Beta/",
            link_pattern: r#"href="(ardopc[^"]*)""#,
        },
        recipe: Recipe {
            configure: NO_STEPS,
            build: NO_STEPS,
            install: InstallMethod::Script(Cmd {
                program: "sudo",
                args: &["install", "-m", "755", "ardopc", "/usr/local/bin/ardopc"],
            }),
            swap_mb: None,
            menu: None,
        },
        dependencies: &[],
        optional: false,
    },
    ApplicationSpec {
        id: "hamclock",
        description: "Wall-clock display of space weather and band conditions",
        strategy: VersionStrategy::AlwaysInstall,
        source: SourceLocator::DownloadPage {
            page: "https://www.clearskyinstitute.com/ham/HamClock/",
            link_pattern: r#"href="(ESPHamClock\.tgz)""#,
        },
        recipe: Recipe {
            configure: NO_STEPS,
            build: &[Cmd {
                program: "make",
                args: &["-j4", "hamclock-800x480"],
            }],
            install: InstallMethod::Script(Cmd {
                program: "sudo",
                args: &["make", "install"],
            }),
            swap_mb: None,
            menu: Some(MenuTweak {
                entry: "hamclock.desktop",
                action: MenuAction::FixExec("hamclock-800x480"),
            }),
        },
        dependencies: &["build-essential", "libx11-dev"],
        optional: false,
    },
];
