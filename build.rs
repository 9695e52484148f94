// 构建脚本: 静态链接FFmpeg时补齐Windows系统库
fn main() {
    // vcpkg 静态 FFmpeg 只在 Windows MSVC 下需要额外的系统库
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // DirectShow 摄像头采集
        println!("cargo:rustc-link-lib=dylib=strmiids");
        println!("cargo:rustc-link-lib=dylib=ole32");
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // RTSP over TLS / 网络
        println!("cargo:rustc-link-lib=dylib=secur32");
        println!("cargo:rustc-link-lib=dylib=ws2_32");
    }
}
